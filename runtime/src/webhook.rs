//! Payment webhook processing.
//!
//! Verification happens before anything else is read. After that the
//! processor resolves the order, asks [`plan_transition`] what the event
//! means for it, compare-and-sets the new status and runs the effects. A
//! lost compare-and-set means another delivery got there first; the order is
//! re-read and planned again, which normally turns into a duplicate.

use mentorlink_core::MarketplaceError;
use mentorlink_core::ports::{Notification, OrderTransition};
use mentorlink_core::types::{OrderId, OrderStatus, OrderTarget, PaymentOrder};
use mentorlink_core::webhook::{
    Effects, OrderReference, PaymentEvent, TargetState, Transition, TransitionEffect, plan_transition,
};

use crate::MarketplaceEnvironment;
use crate::metrics::WebhookMetrics;
use crate::provisioning::{BookingMeetings, MeetingOutcome};
use crate::signature::WebhookSecret;

/// Times an order is re-read after losing a compare-and-set.
const MAX_PLAN_ATTEMPTS: usize = 3;

/// What happened to a meeting requested by a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProvisionReport {
    /// Meeting stored (now or earlier)
    Stored(MeetingOutcome),
    /// Provider or storage failed; payment stands, the URL stays empty
    Failed(MarketplaceError),
}

/// Result of handling one verified delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The order moved
    Applied {
        /// Order
        order_id: OrderId,
        /// Its new status
        status: OrderStatus,
        /// Meeting result, when one was requested
        provisioning: Option<ProvisionReport>,
    },
    /// The event had already been applied
    Duplicate {
        /// Order
        order_id: OrderId,
        /// Recovery meeting result, when one was requested
        provisioning: Option<ProvisionReport>,
    },
    /// No order matches the event
    Unmatched,
    /// Valid but not actionable
    Ignored {
        /// Why
        reason: &'static str,
    },
}

impl WebhookOutcome {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::Duplicate { .. } => "duplicate",
            Self::Unmatched => "unmatched",
            Self::Ignored { .. } => "ignored",
        }
    }
}

/// Verifies and applies payment gateway events.
#[derive(Clone)]
pub struct PaymentWebhookProcessor {
    env: MarketplaceEnvironment,
    secret: WebhookSecret,
    meetings: BookingMeetings,
}

impl PaymentWebhookProcessor {
    /// Create a processor.
    #[must_use]
    pub const fn new(env: MarketplaceEnvironment, secret: WebhookSecret, meetings: BookingMeetings) -> Self {
        Self { env, secret, meetings }
    }

    /// Handle one delivery: the exact raw body and its signature header.
    ///
    /// # Errors
    ///
    /// - [`MarketplaceError::Authentication`] for a missing or wrong
    ///   signature; nothing is read or written
    /// - [`MarketplaceError::Validation`] for a malformed payload
    /// - [`MarketplaceError::NotFound`] when the order's target is gone
    /// - [`MarketplaceError::Persistence`] on storage failure
    pub async fn handle(&self, raw_body: &[u8], signature: Option<&str>) -> Result<WebhookOutcome, MarketplaceError> {
        if let Err(e) = self.secret.verify(raw_body, signature) {
            tracing::warn!(error = %e, "Rejected webhook with invalid signature");
            WebhookMetrics::record("rejected", "unverified");
            return Err(e);
        }

        let event = PaymentEvent::parse(raw_body).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected malformed webhook payload");
            WebhookMetrics::record("rejected", "malformed");
        })?;

        let result = self.apply(&event).await;
        match &result {
            Ok(outcome) => {
                tracing::info!(event = event.label(), outcome = outcome.label(), "Webhook processed");
                WebhookMetrics::record(outcome.label(), event.label());
            }
            Err(e) => {
                tracing::error!(event = event.label(), error = %e, "Webhook processing failed");
                WebhookMetrics::record("error", event.label());
            }
        }
        result
    }

    async fn find_order(&self, reference: OrderReference<'_>) -> Result<Option<PaymentOrder>, MarketplaceError> {
        let found = match reference {
            OrderReference::ExternalOrder(id) => self.env.orders.order_by_external_id(id.to_string()).await?,
            OrderReference::ExternalPayment(id) => self.env.orders.order_by_payment_id(id.to_string()).await?,
        };
        Ok(found)
    }

    async fn apply(&self, event: &PaymentEvent) -> Result<WebhookOutcome, MarketplaceError> {
        let Some(reference) = event.order_reference() else {
            return Ok(WebhookOutcome::Ignored {
                reason: "unsupported event",
            });
        };

        for _ in 0..MAX_PLAN_ATTEMPTS {
            let Some(order) = self.find_order(reference).await? else {
                tracing::info!(reference = ?reference, "Webhook for an unknown order, acknowledging");
                return Ok(WebhookOutcome::Unmatched);
            };

            let target = self
                .env
                .orders
                .target_state(order.target)
                .await?
                .ok_or_else(|| MarketplaceError::not_found(order.target.kind(), order.target.uuid()))?;

            match plan_transition(order.status, event, &target) {
                Transition::Ignore { reason } => {
                    tracing::info!(order_id = %order.id, status = %order.status, reason, "Webhook ignored");
                    return Ok(WebhookOutcome::Ignored { reason });
                }
                Transition::AlreadyApplied { effects, .. } => {
                    tracing::info!(order_id = %order.id, status = %order.status, "Duplicate webhook");
                    let provisioning = self.run_effects(&order, &target, &effects).await;
                    return Ok(WebhookOutcome::Duplicate {
                        order_id: order.id,
                        provisioning,
                    });
                }
                Transition::Apply {
                    from,
                    to,
                    payment_status,
                    effects,
                } => {
                    let transition = OrderTransition {
                        from,
                        to,
                        target: order.target,
                        payment_status,
                        payment_id: event.payment_id().map(str::to_owned),
                        clear_meet_url: effects.contains(&TransitionEffect::ClearMeetUrl),
                        at: self.env.clock.now(),
                    };
                    if !self.env.orders.apply_transition(order.id, transition).await? {
                        tracing::debug!(order_id = %order.id, expected = %from, "Lost status race, re-reading order");
                        continue;
                    }
                    tracing::info!(order_id = %order.id, target = %order.target, from = %from, to = %to, "Order transitioned");
                    let provisioning = self.run_effects(&order, &target, &effects).await;
                    return Ok(WebhookOutcome::Applied {
                        order_id: order.id,
                        status: to,
                        provisioning,
                    });
                }
            }
        }

        Err(MarketplaceError::Persistence(format!(
            "order status kept changing while applying a {} event",
            event.label()
        )))
    }

    async fn run_effects(&self, order: &PaymentOrder, target: &TargetState, effects: &Effects) -> Option<ProvisionReport> {
        let mut provisioning = None;
        for effect in effects {
            match effect {
                TransitionEffect::ProvisionMeeting => {
                    provisioning = Some(self.provision(order, target).await);
                }
                // Applied inside the status write.
                TransitionEffect::ClearMeetUrl => {}
                TransitionEffect::NotifyFailed { reason } => {
                    self.notify(Notification::PaymentFailed {
                        order_id: order.id,
                        target: order.target,
                        reason: reason.clone(),
                    })
                    .await;
                }
                TransitionEffect::NotifyRefunded => {
                    self.notify(Notification::PaymentRefunded {
                        order_id: order.id,
                        target: order.target,
                    })
                    .await;
                }
            }
        }
        provisioning
    }

    async fn provision(&self, order: &PaymentOrder, target: &TargetState) -> ProvisionReport {
        let OrderTarget::Booking(booking_id) = target.target else {
            return ProvisionReport::Failed(MarketplaceError::validation("only bookings carry meetings"));
        };
        let booking = match self.env.bookings.booking(booking_id).await {
            Ok(Some(booking)) => booking,
            Ok(None) => return ProvisionReport::Failed(MarketplaceError::not_found("booking", booking_id)),
            Err(e) => return ProvisionReport::Failed(e.into()),
        };
        match self.meetings.ensure_meeting(&booking).await {
            Ok(outcome) => ProvisionReport::Stored(outcome),
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id,
                    booking_id = %booking_id,
                    error = %e,
                    "Payment captured but meeting not provisioned; left for recovery"
                );
                ProvisionReport::Failed(e)
            }
        }
    }

    async fn notify(&self, notification: Notification) {
        if let Err(e) = self.env.notifier.notify(notification).await {
            tracing::warn!(error = %e, "Payment notification failed");
        }
    }
}
