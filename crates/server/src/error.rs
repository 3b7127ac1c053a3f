//! Error types for the calflow server.
//!
//! This module provides the application error type that implements
//! `IntoResponse` for seamless integration with Axum handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Flow lookup miss
    #[error("Flow not found: {0}")]
    NotFound(String),

    /// Invalid flow definition (e.g. blank source)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid authentication token
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Caller does not own the flow
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Flow identifier already taken by another owner
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Remote source could not be fetched (includes the size cap)
    #[error("cannot request source ({0})")]
    Fetch(String),

    /// Remote source fetched but not parseable as a calendar
    #[error("failed to parse source calendar ({0})")]
    ParseCalendar(String),

    /// Rule evaluation failed or panicked
    #[error("failed to run flow ({0})")]
    Execution(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Fetch(msg) => {
                tracing::warn!(error = %msg, "Source fetch failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            // Distinct status: the source exists but is unusable, which is
            // neither the caller's fault nor an internal fault.
            AppError::ParseCalendar(_) => (StatusCode::EXPECTATION_FAILED, self.to_string()),
            AppError::Execution(msg) => {
                tracing::error!(error = %msg, "Flow execution failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = AppError::NotFound("cannot find flow 'f1'".to_string());
        assert_eq!(err.to_string(), "Flow not found: cannot find flow 'f1'");
    }

    #[test]
    fn test_fetch_message_embeds_cause() {
        let err = AppError::Fetch("connection refused".to_string());
        assert_eq!(err.to_string(), "cannot request source (connection refused)");
    }
}
