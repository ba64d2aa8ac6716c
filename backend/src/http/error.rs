//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;
use crate::services::{AccessError, ValidationReport};

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Failed rules and warnings, for validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            validation: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_validation(mut self, report: ValidationReport) -> Self {
        self.validation = Some(report);
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request (bad path, body or query)
    BadRequest(String),
    /// No active window for the requested key
    WindowNotFound(String),
    /// Engine error
    Access(AccessError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ApiError::new("BAD_REQUEST", msg),
            ),
            AppError::WindowNotFound(msg) => {
                (StatusCode::NOT_FOUND, ApiError::new("WINDOW_NOT_FOUND", msg))
            }
            AppError::Access(AccessError::Validation(report)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::new("VALIDATION_ERROR", report.to_string()).with_validation(report),
            ),
            AppError::Access(AccessError::Conflict(msg)) => (
                StatusCode::CONFLICT,
                ApiError::new("CONFLICT", "This window was just changed, please refresh")
                    .with_details(msg),
            ),
            AppError::Access(AccessError::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg))
            }
            AppError::Access(AccessError::AlreadyExists(msg)) => {
                (StatusCode::CONFLICT, ApiError::new("ALREADY_EXISTS", msg))
            }
            AppError::Access(AccessError::NotCancellable(msg)) => {
                (StatusCode::CONFLICT, ApiError::new("NOT_CANCELLABLE", msg))
            }
            AppError::Access(AccessError::Repository(e)) => {
                let status = if e.is_retryable() {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                tracing::error!("Repository failure: {}", e);
                (status, ApiError::new("REPOSITORY_ERROR", e.to_string()))
            }
        };

        (status, Json(error)).into_response()
    }
}

impl AppError {
    /// Error for a lookup by schedule key, where a miss means "no window".
    pub fn window_lookup(err: AccessError) -> Self {
        match err {
            AccessError::NotFound(msg) => AppError::WindowNotFound(msg),
            other => AppError::Access(other),
        }
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        AppError::Access(err)
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Access(err.into())
    }
}
