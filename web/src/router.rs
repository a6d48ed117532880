//! Route table.

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{make_request_span, propagate_request_id_layer, set_request_id_layer};
use crate::state::AppState;

/// Build the application router.
///
/// ```text
/// POST /webhooks/payments
/// POST /api/bookings
/// GET  /api/mentors/:mentor_id/slots
/// GET  /health
/// GET  /ready
/// GET  /metrics
/// ```
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/payments", post(handlers::payment_webhook))
        .route("/api/bookings", post(handlers::create_booking))
        .route("/api/mentors/:mentor_id/slots", get(handlers::list_slots))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
