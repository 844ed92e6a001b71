//! API error types and conversions

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::Envelope;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Application code reported for every failure except "not found"
const FAILURE_CODE: i64 = -1;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Storage operation failed
    StorageError(String),

    /// Invalid request parameters
    InvalidRequest(String),

    /// Resource not found
    NotFound(String),

    /// Internal server error
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::StorageError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_CODE, msg),
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, FAILURE_CODE, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, 404, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_CODE, msg),
        };

        let body = Json(Envelope::<()> {
            code,
            message,
            data: None,
        });

        (status, body).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::StorageError(err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid(msg) => ApiError::InvalidRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
