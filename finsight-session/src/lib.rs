//! # finsight-session
//!
//! Conversation state and checkpointing.
//!
//! - [`ConversationState`] - append-only turn history plus scope and level
//! - [`Checkpointer`] - load/commit of whole snapshots
//!   ([`InMemoryCheckpointer`], `SqliteCheckpointer` with the `sqlite` feature)
//! - [`ConversationLocks`] - one async mutex per conversation id
//! - [`UserLevel`] - the closed set of expertise levels

pub mod checkpointer;
pub mod error;
pub mod level;
pub mod lock;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod state;

pub use checkpointer::{Checkpointer, InMemoryCheckpointer};
pub use error::{Result, SessionError};
pub use level::UserLevel;
pub use lock::{ConversationGuard, ConversationLocks};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCheckpointer;
pub use state::{ConversationState, Role, Turn};
