//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers should return
//! `Result<T, AppError>`. Status codes follow the sync failure taxonomy:
//! signature mismatch is 401, expected absence is 404, a mapping failure is
//! 422, missing configuration is 500, and upstream trouble is 502.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use saltbridge_sync::{Classify, FailureClass, SyncError};

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Sync pipeline operation failed.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request failed authentication (bad token, bad signature).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request was authenticated but the credential is wrong.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Sync(err) => match err.class() {
                FailureClass::Transient | FailureClass::Permanent => StatusCode::BAD_GATEWAY,
                FailureClass::NotFound => StatusCode::NOT_FOUND,
                FailureClass::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
                FailureClass::Mapping => StatusCode::UNPROCESSABLE_ENTITY,
            },
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Sync(err) if status.is_server_error() => match err.class() {
                FailureClass::Configuration => "Sync pipeline is not fully configured".to_string(),
                _ => "External service error".to_string(),
            },
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_failure_taxonomy() {
        assert_eq!(
            AppError::Sync(SyncError::NoLocation).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Sync(SyncError::NoMappableLines {
                order_id: "x".into()
            })
            .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Unauthorized("bad hmac".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::NotFound("variant".into()).status(),
            StatusCode::NOT_FOUND
        );
    }
}
