//! Error types for mealdb-etl
//!
//! `EtlError` is the pipeline taxonomy. Record-level variants are absorbed
//! and tallied by the pipeline; a batch-level error is logged and returned.
//! `ApiError` wraps it for dashboard handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Pipeline error taxonomy
#[derive(Debug, Error)]
pub enum EtlError {
    /// Remote API unreachable, timed out, returned a bad status or body
    #[error("Network error: {0}")]
    Network(String),

    /// One raw record is unusable (missing identifier or name)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store write or read failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Connection parameters unusable
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<sqlx::Error> for EtlError {
    fn from(err: sqlx::Error) -> Self {
        EtlError::Storage(err.to_string())
    }
}

impl From<mealdb_common::Error> for EtlError {
    fn from(err: mealdb_common::Error) -> Self {
        match err {
            mealdb_common::Error::Config(msg) => EtlError::Configuration(msg),
            mealdb_common::Error::InvalidInput(msg) => EtlError::Validation(msg),
            other => EtlError::Storage(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for EtlError {
    fn from(err: reqwest::Error) -> Self {
        EtlError::Network(err.to_string())
    }
}

/// Result type for pipeline operations
pub type EtlResult<T> = Result<T, EtlError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - a pipeline run is already in progress
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Pipeline error
    #[error(transparent)]
    Etl(#[from] EtlError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Etl(ref err) => match err {
                EtlError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                EtlError::Network(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "NETWORK_ERROR",
                    err.to_string(),
                ),
                EtlError::Storage(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    err.to_string(),
                ),
                EtlError::Configuration(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIGURATION_ERROR",
                    err.to_string(),
                ),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
