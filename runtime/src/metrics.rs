//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for:
//! - Payment webhook handling
//! - Booking requests
//! - Meeting provisioning calls
//! - The workshop link job and the booking link recovery sweep
//!
//! The server installs the recorder once at startup with [`install_recorder`]
//! and serves [`PrometheusHandle::render`] on `GET /metrics`.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

fn builder() -> Result<PrometheusBuilder, MetricsError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))
}

/// Describe every metric and install the global Prometheus recorder.
///
/// # Errors
///
/// Returns [`MetricsError`] if the exporter cannot be built or a recorder is
/// already installed.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = builder()?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;
    register_metrics();
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// A handle backed by a recorder that is not installed globally.
///
/// Renders an empty exposition; used where `/metrics` must answer but no
/// recorder was installed (tests, tools).
///
/// # Errors
///
/// Returns [`MetricsError::Build`] if the exporter cannot be built.
pub fn detached_handle() -> Result<PrometheusHandle, MetricsError> {
    Ok(builder()?.build_recorder().handle())
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "webhook_events_total",
        "Payment webhook deliveries by outcome (applied, duplicate, unmatched, ignored, rejected, error)"
    );
    describe_counter!(
        "bookings_requested_total",
        "Booking requests by outcome (awaiting_payment, confirmed, conflict, rejected, error)"
    );
    describe_counter!(
        "meeting_provision_total",
        "Meeting provisioning calls by outcome (created, failed)"
    );
    describe_histogram!(
        "meeting_provision_duration_seconds",
        "Time taken to provision a meeting, retries included"
    );
    describe_counter!(
        "workshop_job_runs_total",
        "Workshop link job runs by outcome (completed, skipped, error)"
    );
    describe_counter!(
        "workshop_links_created_total",
        "Workshop meeting links persisted"
    );
    describe_counter!(
        "workshop_links_skipped_total",
        "Workshop links discarded because another run stored the key first"
    );
    describe_counter!(
        "workshop_job_failures_total",
        "Per-workshop or per-call failures inside workshop link job runs"
    );
    describe_histogram!(
        "workshop_job_duration_seconds",
        "Time taken by one workshop link job run"
    );
    describe_counter!(
        "booking_link_recoveries_total",
        "Booking meeting links recovered by the sweep, by outcome (created, failed)"
    );
}

/// Webhook metrics recorder.
pub struct WebhookMetrics;

impl WebhookMetrics {
    /// Record one delivery.
    pub fn record(outcome: &'static str, event: &'static str) {
        counter!("webhook_events_total", "outcome" => outcome, "event" => event).increment(1);
    }
}

/// Booking metrics recorder.
pub struct BookingMetrics;

impl BookingMetrics {
    /// Record one booking request.
    pub fn record(outcome: &'static str) {
        counter!("bookings_requested_total", "outcome" => outcome).increment(1);
    }
}

/// Meeting provisioning metrics recorder.
pub struct ProvisionMetrics;

impl ProvisionMetrics {
    /// Record one provisioning attempt (retries included).
    pub fn record(outcome: &'static str, duration: Duration) {
        counter!("meeting_provision_total", "outcome" => outcome).increment(1);
        histogram!("meeting_provision_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Workshop link job metrics recorder.
pub struct WorkshopJobMetrics;

impl WorkshopJobMetrics {
    /// Record a run the debounce marker skipped.
    pub fn record_skipped() {
        counter!("workshop_job_runs_total", "outcome" => "skipped").increment(1);
    }

    /// Record a run that could not start or page.
    pub fn record_error() {
        counter!("workshop_job_runs_total", "outcome" => "error").increment(1);
    }

    /// Record a completed run.
    pub fn record_completed(created: u64, skipped: u64, failures: u64, duration: Duration) {
        counter!("workshop_job_runs_total", "outcome" => "completed").increment(1);
        counter!("workshop_links_created_total").increment(created);
        counter!("workshop_links_skipped_total").increment(skipped);
        counter!("workshop_job_failures_total").increment(failures);
        histogram!("workshop_job_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Booking link recovery metrics recorder.
pub struct RecoveryMetrics;

impl RecoveryMetrics {
    /// Record the results of one sweep.
    pub fn record(created: u64, failed: u64) {
        counter!("booking_link_recoveries_total", "outcome" => "created").increment(created);
        counter!("booking_link_recoveries_total", "outcome" => "failed").increment(failed);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_handle_renders() {
        let handle = detached_handle().unwrap();
        assert!(!handle.render().contains("webhook_events_total"));
    }

    #[test]
    fn test_recorders_without_global_recorder_are_noops() {
        WebhookMetrics::record("applied", "captured");
        BookingMetrics::record("conflict");
        ProvisionMetrics::record("created", Duration::from_millis(12));
        WorkshopJobMetrics::record_completed(2, 1, 0, Duration::from_secs(1));
        RecoveryMetrics::record(1, 0);
    }
}
