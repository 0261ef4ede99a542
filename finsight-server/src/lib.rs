//! `finsight-server` exposes the FinSight conversation pipeline over HTTP.
//! Conversations are created and listed here; each posted message runs one
//! retrieve, generate and follow-up turn.

pub mod catalog;
pub mod config;
pub mod error;
pub mod server;

pub use catalog::{
    CatalogError, ConversationCatalog, ConversationRecord, InMemoryCatalog, NewConversation,
    SessionType,
};
#[cfg(feature = "sqlite")]
pub use catalog::SqliteCatalog;
pub use config::AppConfig;
pub use error::ApiError;
pub use server::{AppState, ServerConfig, app_router, run_server};
