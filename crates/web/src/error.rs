//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`
//! and every error body has the shape `{success: false, error, code}`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mib_core::ErrorKind;
use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;
use crate::session::StoreError;

/// Message shown for any server-side failure.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Session store operation failed.
    #[error("Session store error: {0}")]
    Session(#[from] StoreError),

    /// Upstream backend failed where no fallback exists.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// No valid session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Malformed or incomplete request.
    #[error("{0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Too many requests")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "Rejected request body");
        Self::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// JSON body for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: ErrorKind,
}

impl AppError {
    /// Closed error kind reported to the client.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Session(_) | Self::Backend(_) | Self::Internal(_) => ErrorKind::Internal,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::RateLimited => ErrorKind::RateLimited,
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) | Self::Backend(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
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
        let error = if status.is_server_error() {
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            success: false,
            error,
            code: self.kind(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after a session is created to associate errors with users.
pub fn set_sentry_user(user_id: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_authenticated_body() {
        let (status, body) = body_json(AppError::NotAuthenticated).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Not authenticated");
        assert_eq!(body["code"], "not_authenticated");
    }

    #[tokio::test]
    async fn test_internal_error_is_not_leaked() {
        let (status, body) =
            body_json(AppError::Internal("redis exploded at 10.0.0.4".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], GENERIC_ERROR_MESSAGE);
        assert_eq!(body["code"], "internal");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::NotFound("Member not found".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::BadRequest("missing email".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_client_errors_keep_message() {
        let (_, body) = body_json(AppError::BadRequest("Email is required".to_string())).await;
        assert_eq!(body["error"], "Email is required");
        assert_eq!(body["code"], "bad_request");
    }
}
