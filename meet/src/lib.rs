//! # MentorLink Meet Client
//!
//! HTTP client for the external meeting-link provider, implementing
//! [`MeetingProvisioner`](mentorlink_core::ports::MeetingProvisioner).
//!
//! Each call is a single `POST {base_url}/meetings`; retries and backoff are
//! the caller's concern. Failures convert into
//! [`RemoteServiceError`](mentorlink_core::RemoteServiceError) with the retry
//! classification from [`MeetError::is_retryable`].
//!
//! ## Example
//!
//! ```no_run
//! use mentorlink_meet::{MeetClient, MeetClientConfig};
//! use std::time::Duration;
//!
//! let client = MeetClient::new(MeetClientConfig {
//!     base_url: "https://meet.example.com/api".to_string(),
//!     api_token: "token".to_string(),
//!     request_timeout: Duration::from_secs(10),
//! })?;
//! # Ok::<(), mentorlink_meet::MeetError>(())
//! ```

pub mod client;
pub mod error;

/// Service name carried by errors from this client.
pub const SERVICE: &str = "meet";

pub use client::{MeetClient, MeetClientConfig};
pub use error::MeetError;
