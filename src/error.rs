//! Error types for MediaLodge
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

/// Application-wide error type
///
/// This enum represents all possible errors that can occur
/// in the application. It implements `IntoResponse` to
/// automatically convert errors to appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// No valid session present; the boundary redirects to the
    /// authentication-required page rather than answering 401.
    #[error("Authentication required")]
    Unauthenticated,

    /// Access denied (403)
    #[error("Access denied")]
    Forbidden,

    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// CSRF state token missing or mismatched (401)
    #[error("Invalid state token")]
    InvalidState,

    /// Identity provider exchange failed (502 outside the callback flow)
    #[error("Identity resolution failed: {0}")]
    Identity(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Media storage error (500)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body. `Unauthenticated` is the exception:
    /// it becomes a redirect to the auth-required page.
    fn into_response(self) -> Response {
        use axum::Json;

        use crate::metrics::ERRORS_TOTAL;

        if matches!(self, AppError::Unauthenticated) {
            ERRORS_TOTAL.with_label_values(&["unauthenticated"]).inc();
            return Redirect::temporary("/auth-required").into_response();
        }

        let (status, error_message, error_type) = match &self {
            AppError::Unauthenticated => unreachable!("handled above"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string(), "forbidden"),
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string(), "not_found"),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation"),
            AppError::InvalidState => {
                (StatusCode::UNAUTHORIZED, self.to_string(), "invalid_state")
            }
            AppError::Identity(msg) => (StatusCode::BAD_GATEWAY, msg.clone(), "identity"),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string(), "http_client"),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
                "database",
            ),
            AppError::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "storage"),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "config"),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
        };

        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
