//! Application state for Axum handlers.

use mentorlink_core::ports::ReadinessProbe;
use mentorlink_runtime::{BookingOrderCoordinator, PaymentWebhookProcessor};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Everything inside is cheap to clone; Axum clones the state per request.
#[derive(Clone)]
pub struct AppState {
    /// Booking requests and slot queries
    pub coordinator: BookingOrderCoordinator,
    /// Payment gateway deliveries
    pub webhooks: PaymentWebhookProcessor,
    /// Database reachability for `/ready`
    pub readiness: Arc<dyn ReadinessProbe>,
    /// Renders `/metrics`
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        coordinator: BookingOrderCoordinator,
        webhooks: PaymentWebhookProcessor,
        readiness: Arc<dyn ReadinessProbe>,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            coordinator,
            webhooks,
            readiness,
            metrics,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
