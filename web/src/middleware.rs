//! Request tracking and observability.
//!
//! Every request gets an `x-request-id` (taken from the client or generated
//! as a UUID). The id is recorded on the request's tracing span and echoed
//! back on the response.
//!
//! # Flow
//!
//! 1. `SetRequestIdLayer` fills in the header when the client sent none
//! 2. `TraceLayer` opens a span via [`make_request_span`]
//! 3. `PropagateRequestIdLayer` copies the header onto the response

use axum::{body::Body, http::Request};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header name for request ids.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Layer that assigns missing request ids.
#[must_use]
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer that echoes the request id on the response.
#[must_use]
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Span for one HTTP request.
pub fn make_request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
    )
}
