//! Error types for the meeting provider client

use mentorlink_core::RemoteServiceError;
use reqwest::StatusCode;
use thiserror::Error;

use crate::SERVICE;

/// Errors that can occur when talking to the meeting provider
#[derive(Debug, Error)]
pub enum MeetError {
    /// The HTTP client could not be built
    #[error("Client setup failed: {0}")]
    ClientSetup(String),

    /// The request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection could not be established or was dropped
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Any other transport failure
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response body was not the expected JSON
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// API returned an error status
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error body from the API
        message: String,
    },
}

impl MeetError {
    /// Whether repeating the identical call may succeed.
    ///
    /// Timeouts, connection failures, 408, 429 and 5xx are transient.
    /// Everything else, including 400/401/403/404/422 and unparsable
    /// responses, will fail again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connect(_) => true,
            Self::ApiError { status, .. } => StatusCode::from_u16(*status).is_ok_and(|status| {
                status == StatusCode::REQUEST_TIMEOUT
                    || status == StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error()
            }),
            Self::ClientSetup(_) | Self::RequestFailed(_) | Self::ResponseParseFailed(_) => false,
        }
    }
}

impl From<reqwest::Error> for MeetError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_decode() {
            Self::ResponseParseFailed(e.to_string())
        } else {
            Self::RequestFailed(e.to_string())
        }
    }
}

impl From<MeetError> for RemoteServiceError {
    fn from(e: MeetError) -> Self {
        Self {
            service: SERVICE,
            retryable: e.is_retryable(),
            message: e.to_string(),
        }
    }
}
