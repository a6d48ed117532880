//! Payment gateway webhook endpoint.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the hex HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Acknowledgement returned for every processed delivery.
#[derive(Debug, Serialize)]
pub struct Received {
    /// Always `true`
    pub received: bool,
}

/// Receive a payment event.
///
/// The body is taken as raw bytes: the signature covers them exactly, so it
/// must be checked before any JSON parsing.
///
/// # Endpoint
///
/// ```text
/// POST /webhooks/payments
/// ```
///
/// # Errors
///
/// 400 for a bad signature or malformed payload, 404 when the paid-for
/// record is gone, 500 on storage failure.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Received>, AppError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    state
        .webhooks
        .handle(&body, signature)
        .await
        .map_err(AppError::webhook)?;
    Ok(Json(Received { received: true }))
}
