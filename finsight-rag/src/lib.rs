//! # finsight-rag
//!
//! Retrieval over the pre-embedded chunks of financial documents.
//!
//! The crate covers the read side of the pipeline only: chunking and
//! embedding of documents happen at ingestion time elsewhere.
//!
//! ## Overview
//!
//! - [`EmbeddingProvider`] turns query text into a vector.
//! - [`ChunkStore`] reads the chunk corpus ([`InMemoryChunkStore`], or
//!   `PgChunkStore` behind the `pgvector` feature).
//! - [`SimilaritySearch`] ranks chunks by cosine similarity with a
//!   deterministic tie-break, optionally scoped to one document.
//! - [`ContextAssembler`] applies the relevance threshold and builds the
//!   bounded context block.
//!
//! ## Feature flags
//!
//! | Feature    | Enables                          |
//! |------------|----------------------------------|
//! | `openai`   | `OpenAIEmbeddingProvider`        |
//! | `pgvector` | `PgChunkStore` (PostgreSQL)      |
//! | `full`     | All of the above                 |

pub mod chunkstore;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod inmemory;
pub mod search;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pgvector")]
pub mod pgvector;

pub use chunkstore::{ChunkStore, cosine_similarity};
pub use config::{MAX_TOP_K, RagConfig, RagConfigBuilder};
pub use context::{AssembledContext, ContextAssembler, RelevanceDecision, truncate_chars};
pub use document::{DocumentChunk, RetrievalResult, ScoredChunk, rank};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use inmemory::InMemoryChunkStore;
pub use search::SimilaritySearch;

#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
#[cfg(feature = "pgvector")]
pub use pgvector::PgChunkStore;
