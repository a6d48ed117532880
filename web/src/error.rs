//! Error types for web handlers.
//!
//! [`AppError`] maps the [`MarketplaceError`] taxonomy onto HTTP responses and
//! implements Axum's `IntoResponse`. Server-side causes are logged and never
//! shown to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mentorlink_core::MarketplaceError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<Body>, AppError> {
///     let outcome = state.coordinator.request_booking(request).await?;
///     Ok(Json(outcome.into()))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Internal error (for logging, not exposed to client)
    source: Option<MarketplaceError>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach the cause that is logged for server errors.
    #[must_use]
    pub fn with_source(mut self, source: MarketplaceError) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND")
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message, "CONFLICT")
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message, "VALIDATION_ERROR")
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_SERVER_ERROR")
    }

    /// Mapping used on the payment webhook path, where a payload the
    /// gateway got wrong is a plain bad request rather than a 422.
    #[must_use]
    pub fn webhook(err: MarketplaceError) -> Self {
        match err {
            MarketplaceError::Validation(message) => Self::bad_request(message),
            other => other.into(),
        }
    }

    /// Response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl From<MarketplaceError> for AppError {
    fn from(err: MarketplaceError) -> Self {
        let message = err.to_string();
        match err {
            MarketplaceError::Validation(reason) => Self::validation(reason),
            MarketplaceError::NoAvailability { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, message, "NO_AVAILABILITY")
            }
            MarketplaceError::Conflict { .. } => Self::conflict(message),
            MarketplaceError::Authentication(_) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid signature", "INVALID_SIGNATURE")
            }
            MarketplaceError::NotFound { .. } => Self::not_found(message),
            err @ MarketplaceError::RemoteService(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "An upstream service failed", "UPSTREAM_FAILURE").with_source(err)
            }
            err @ MarketplaceError::Persistence(_) => Self::internal("An internal error occurred").with_source(err),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    /// Error code (for client error handling).
    code: &'a str,
    /// Human-readable error message.
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "Request failed"
                ),
                None => tracing::error!(status = %self.status, code = self.code, message = %self.message, "Request failed"),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
