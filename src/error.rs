// Error taxonomy for queries, ingestion and the cache backend.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for read and write operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors surfaced by query validation and by the store.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Resolution is not one of 1m, 5m, 1h, or resolved to a target outside the allow-list.
    #[error("invalid resolution: {0}")]
    InvalidResolution(String),

    /// Unknown scope, or host/vm presence does not match the scope.
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    /// Limit must be a positive integer.
    #[error("invalid limit: {0} (must be a positive integer)")]
    InvalidLimit(i64),

    /// Time window is inverted, or compare windows overlap.
    #[error("invalid window: {0}")]
    InvalidWindow(String),

    /// Query string or request body could not be read into the expected shape.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Store connection or query failure.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// A row could not be converted between its stored and typed form.
    #[error("row conversion failed: {0}")]
    Conversion(String),
}

impl QueryError {
    /// True for errors rejected before any store access.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidResolution(_)
                | Self::InvalidScope(_)
                | Self::InvalidLimit(_)
                | Self::InvalidWindow(_)
                | Self::InvalidRequest(_)
        )
    }
}

impl From<QueryRejection> for QueryError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for QueryError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

/// Cache backend failures. Never surfaced to API callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            Self::InvalidResolution(_) => (StatusCode::BAD_REQUEST, "invalid_resolution"),
            Self::InvalidScope(_) => (StatusCode::BAD_REQUEST, "invalid_scope"),
            Self::InvalidLimit(_) => (StatusCode::BAD_REQUEST, "invalid_limit"),
            Self::InvalidWindow(_) => (StatusCode::BAD_REQUEST, "invalid_window"),
            Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Self::Store(_) | Self::Conversion(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "query failed");
        }
        let body = ErrorResponse {
            error,
            message: self.to_string(),
        };
        (status, axum::Json(body)).into_response()
    }
}
