//! Error types for the `finsight-model` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by a [`TextGenerator`](crate::TextGenerator).
#[derive(Debug, Error)]
pub enum ModelError {
    /// The HTTP request could not be sent or the connection failed.
    #[error("Request to {provider} failed: {message}")]
    Request { provider: String, message: String },

    /// The provider answered with a non-success status.
    #[error("{provider} API returned {status}: {message}")]
    Api { provider: String, status: u16, message: String },

    /// The provider did not answer within the configured deadline.
    #[error("{provider} did not respond within {}s", .elapsed.as_secs())]
    Timeout { provider: String, elapsed: Duration },

    /// The provider answered but produced no text.
    #[error("{provider} returned an empty completion")]
    EmptyResponse { provider: String },

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ModelError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { .. } | Self::Timeout { .. } | Self::EmptyResponse { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Config(_) => false,
        }
    }
}

/// A convenience result type for generation calls.
pub type Result<T> = std::result::Result<T, ModelError>;
