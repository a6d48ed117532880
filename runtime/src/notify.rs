//! Notification delivery through the log.

use mentorlink_core::ports::{Notification, Notifier, RemoteFuture};

/// Notifier that records each notification as a structured `tracing` event.
///
/// Stands in wherever no email or chat channel is wired up; the events carry
/// enough fields for a log shipper to route them.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) -> RemoteFuture<'_, ()> {
        match &notification {
            Notification::MeetingReady { booking_id, meet_url } => {
                tracing::info!(kind = "meeting_ready", booking_id = %booking_id, meet_url = %meet_url, "Notification");
            }
            Notification::PaymentFailed {
                order_id,
                target,
                reason,
            } => {
                tracing::info!(
                    kind = "payment_failed",
                    order_id = %order_id,
                    target = %target,
                    reason = reason.as_deref().unwrap_or("-"),
                    "Notification"
                );
            }
            Notification::PaymentRefunded { order_id, target } => {
                tracing::info!(kind = "payment_refunded", order_id = %order_id, target = %target, "Notification");
            }
        }
        Box::pin(async { Ok(()) })
    }
}
