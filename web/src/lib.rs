//! Axum HTTP surface for MentorLink.
//!
//! Handlers are thin: they extract the request, call the runtime shell and
//! map the outcome onto a response. Business rules live in
//! `mentorlink-runtime` and `mentorlink-core`.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract data** from the request (JSON, raw body, headers, path)
//! 3. **Call** the coordinator or webhook processor
//! 4. **Map result** to an HTTP response through [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! use mentorlink_web::{router, AppState};
//!
//! let state = AppState::new(coordinator, webhooks, readiness, metrics_handle);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router(state)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::AppError;
pub use middleware::REQUEST_ID_HEADER;
pub use router::router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
