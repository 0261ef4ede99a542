//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use finsight_conversation::{ErrorKind, PipelineError};
use finsight_session::SessionError;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::catalog::CatalogError;

/// An error rendered as `{"error": {"code", "message", "retryable"}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    retryable: bool,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, code: "validation", message: message.into(), retryable: false }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, code: "not_found", message: message.into(), retryable: false }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err.kind {
            ErrorKind::Validation => Self::validation(err.message),
            ErrorKind::NotFound => Self::not_found(err.message),
            ErrorKind::UpstreamUnavailable => {
                error!(stage = %err.stage, error = %err.message, "upstream failure");
                Self {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    code: "upstream_unavailable",
                    message: "a downstream service is unavailable, please retry".to_string(),
                    retryable: true,
                }
            }
            ErrorKind::Storage => {
                error!(stage = %err.stage, error = %err.message, "storage failure");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "storage",
                    message: "conversation storage failed".to_string(),
                    retryable: false,
                }
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidLevel(_) => Self::validation(err.to_string()),
            other => {
                error!(error = %other, "session failure");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "storage",
                    message: "conversation storage failed".to_string(),
                    retryable: false,
                }
            }
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::MissingDocument => Self::validation(err.to_string()),
            CatalogError::Storage { .. } => {
                error!(error = %err, "catalog failure");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "storage",
                    message: "conversation storage failed".to_string(),
                    retryable: false,
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { code: self.code, message: &self.message, retryable: self.retryable };
        (self.status, Json(json!({ "error": body }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use finsight_conversation::Stage;

    use super::*;

    #[test]
    fn pipeline_kinds_map_to_status_codes() {
        let cases = [
            (PipelineError::validation(Stage::Start, "x"), StatusCode::BAD_REQUEST),
            (PipelineError::not_found(Stage::Retrieve, "x"), StatusCode::NOT_FOUND),
            (PipelineError::upstream(Stage::Generate, "x"), StatusCode::SERVICE_UNAVAILABLE),
            (PipelineError::storage(Stage::End, "x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn catalog_storage_failure_is_500_with_generic_message() {
        let api = ApiError::from(CatalogError::Storage {
            backend: "sqlite".into(),
            message: "database is locked".into(),
        });
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.message.contains("locked"));
        assert_eq!(ApiError::from(CatalogError::MissingDocument).status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_details_are_not_exposed() {
        let api = ApiError::from(PipelineError::upstream(Stage::Generate, "sk-secret 401"));
        assert!(api.retryable);
        assert!(!api.message.contains("sk-secret"));
    }
}
