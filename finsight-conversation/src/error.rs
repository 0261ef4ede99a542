//! The error returned by a failed turn.

use std::fmt;

use finsight_model::ModelError;
use finsight_rag::RagError;
use finsight_session::SessionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline position at which a turn failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Retrieve,
    Generate,
    Followup,
    End,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Retrieve => "retrieve",
            Self::Generate => "generate",
            Self::Followup => "followup",
            Self::End => "end",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure category, used by callers to pick a response and decide on retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input. Not retryable.
    Validation,
    /// The requested document scope has no chunks.
    NotFound,
    /// The embedder or generation service failed or timed out.
    UpstreamUnavailable,
    /// The checkpoint store failed.
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed turn. Nothing was committed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} error in {stage} stage: {message}")]
pub struct PipelineError {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
}

impl PipelineError {
    pub fn new(stage: Stage, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { stage, kind, message: message.into() }
    }

    pub fn validation(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, ErrorKind::Validation, message)
    }

    pub fn not_found(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, ErrorKind::NotFound, message)
    }

    pub fn upstream(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, ErrorKind::UpstreamUnavailable, message)
    }

    pub fn storage(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, ErrorKind::Storage, message)
    }

    /// Only upstream failures are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::UpstreamUnavailable
    }

    pub fn from_rag(stage: Stage, err: RagError) -> Self {
        let kind = match &err {
            RagError::EmbeddingError { .. } | RagError::ChunkStoreError { .. } => {
                ErrorKind::UpstreamUnavailable
            }
            RagError::DocumentNotFound { .. } => ErrorKind::NotFound,
            RagError::DimensionMismatch { .. }
            | RagError::InvalidRequest(_)
            | RagError::ConfigError(_) => ErrorKind::Validation,
        };
        Self::new(stage, kind, err.to_string())
    }

    pub fn from_model(stage: Stage, err: ModelError) -> Self {
        Self::upstream(stage, err.to_string())
    }

    pub fn from_session(stage: Stage, err: SessionError) -> Self {
        let kind = match &err {
            SessionError::InvalidLevel(_) => ErrorKind::Validation,
            SessionError::Storage { .. } | SessionError::Serialization(_) => ErrorKind::Storage,
        };
        Self::new(stage, kind, err.to_string())
    }
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_upstream_is_retryable() {
        assert!(PipelineError::upstream(Stage::Generate, "timeout").is_retryable());
        assert!(!PipelineError::validation(Stage::Start, "empty").is_retryable());
        assert!(!PipelineError::not_found(Stage::Retrieve, "doc").is_retryable());
        assert!(!PipelineError::storage(Stage::End, "disk").is_retryable());
    }

    #[test]
    fn rag_errors_map_to_kinds() {
        let missing = RagError::DocumentNotFound { document_id: "d".into() };
        assert_eq!(PipelineError::from_rag(Stage::Retrieve, missing).kind, ErrorKind::NotFound);

        let embed = RagError::EmbeddingError { provider: "p".into(), message: "m".into() };
        assert!(PipelineError::from_rag(Stage::Retrieve, embed).is_retryable());
    }

    #[test]
    fn display_names_stage_and_kind() {
        let err = PipelineError::upstream(Stage::Followup, "only 2 questions");
        assert_eq!(err.to_string(), "upstream_unavailable error in followup stage: only 2 questions");
    }
}
