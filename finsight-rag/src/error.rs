//! Error types for the `finsight-rag` crate.

use thiserror::Error;

/// Errors that can occur while retrieving and assembling context.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the chunk store backend.
    #[error("Chunk store error ({backend}): {message}")]
    ChunkStoreError {
        /// The chunk store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A search was scoped to a document that has no chunks.
    #[error("No chunks found for document '{document_id}'")]
    DocumentNotFound {
        /// The requested scope.
        document_id: String,
    },

    /// The query vector does not match the corpus dimension.
    #[error("Query vector has {actual} dimensions, corpus expects {expected}")]
    DimensionMismatch {
        /// Dimension of the corpus embeddings.
        expected: usize,
        /// Dimension of the supplied query vector.
        actual: usize,
    },

    /// Malformed search input.
    #[error("Invalid search request: {0}")]
    InvalidRequest(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    /// Whether the failure came from an external dependency (embedder or store I/O).
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::EmbeddingError { .. } | Self::ChunkStoreError { .. })
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
