//! # Error Module
//!
//! Crate-wide error taxonomy for the authorization service. Every failure a
//! request can hit maps to exactly one variant, and every variant maps to
//! exactly one HTTP status:
//!
//! | Variant | Status | Meaning |
//! |---|---|---|
//! | `BadInput` | 400 | validation or sanitiser rejected the input |
//! | `Unauthorized` | 401 | missing/malformed tenant credential |
//! | `Forbidden` | 403 | credential valid, operation denied |
//! | `NotFound` | 404 | entity required by the operation does not exist |
//! | `Conflict` | 409 | conflicting non-idempotent state change |
//! | `StoreUnavailable` | 503 | database timeout or connection failure |
//! | `Internal` | 500 | unclassified |
//!
//! Store errors never leak driver detail to callers: `From<sqlx::Error>`
//! collapses them into `StoreUnavailable` or `Internal`. Business-logic
//! precondition failures are not errors at all; they surface as
//! `{"result": false}` payloads.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::response::ApiResponse;

/// Service-wide error type. See the module docs for the HTTP mapping.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    BadInput(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// The single HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::BadInput(_) => StatusCode::BAD_REQUEST,
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            // Transient connectivity problems: the caller may retry with backoff.
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => {
                tracing::error!("database unavailable: {}", err);
                AuthError::StoreUnavailable(err.to_string())
            }
            other => {
                tracing::error!("database error: {}", other);
                AuthError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiResponse::error(self.status(), &self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(AuthError::BadInput("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::StoreUnavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AuthError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn pool_timeout_is_store_unavailable() {
        let err: AuthError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
    }

    #[test]
    fn row_not_found_is_internal() {
        let err: AuthError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
