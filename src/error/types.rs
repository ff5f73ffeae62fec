/**
 * API Error Type
 *
 * This module defines the error type returned by all HTTP handlers. Each
 * variant maps to an HTTP status code, and the response body is always
 * `{ "message": "..." }` so the client can surface the message directly.
 *
 * # Error Categories
 *
 * - `Validation` - missing or malformed input (400)
 * - `Unauthorized` - missing/invalid credentials (401)
 * - `Forbidden` - authenticated but not the resource owner (403)
 * - `NotFound` - the referenced entity does not exist (404)
 * - `DomainRule` - a domain precondition failed: insufficient balance,
 *   daily cap reached, duplicate vote, already finalized (400)
 * - `DatabaseUnavailable` - the server is running without a database (503)
 * - `Database` / `Internal` - unexpected failures (500)
 */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Error type for all API handlers
///
/// Handlers return `Result<_, ApiError>`; the `IntoResponse` impl translates
/// the error into an HTTP status plus a JSON `{ message }` body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request input
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to act on this resource
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// A domain precondition failed (insufficient balance, daily cap,
    /// duplicate vote, already finalized, ...)
    #[error("{0}")]
    DomainRule(String),

    /// The server was started without a configured database
    #[error("Database not configured")]
    DatabaseUnavailable,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Any other unexpected failure
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Shorthand for a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a domain-rule violation
    pub fn domain(message: impl Into<String>) -> Self {
        Self::DomainRule(message.into())
    }

    /// Shorthand for a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::DomainRule(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DatabaseUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }
        let body = Json(serde_json::json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            ApiError::validation("bad input").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("not yours".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::not_found("missing").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::domain("already finalized").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::DatabaseUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_message_passthrough() {
        let err = ApiError::domain("Not enough versePoints.");
        assert_eq!(err.to_string(), "Not enough versePoints.");
    }

    #[test]
    fn test_from_sqlx_error() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
