//! Error types for the `finsight-session` crate.

use thiserror::Error;

/// Errors raised while parsing session input or persisting state.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A user level string outside `beginner | intermediate | advanced`.
    #[error("Unknown user level '{0}', expected beginner, intermediate or advanced")]
    InvalidLevel(String),

    /// The checkpoint backend failed.
    #[error("Checkpoint storage error ({backend}): {message}")]
    Storage { backend: String, message: String },

    /// A stored snapshot could not be encoded or decoded.
    #[error("Checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A convenience result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
