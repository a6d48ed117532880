//! Payment webhook events and the order transition function.
//!
//! Parsing turns the gateway's raw JSON into a [`PaymentEvent`];
//! [`plan_transition`] decides, without touching storage, what the event does
//! to an order in a given state. The shell applies the plan with a
//! compare-and-set on the order status and carries out the effects.

use serde::Deserialize;
use smallvec::SmallVec;

use crate::error::{MarketplaceError, Result};
use crate::types::{OrderStatus, OrderTarget};

/// Gateway event name for a captured payment.
pub const EVENT_PAYMENT_CAPTURED: &str = "payment.captured";
/// Gateway event name for a failed payment.
pub const EVENT_PAYMENT_FAILED: &str = "payment.failed";
/// Gateway event names for a refund.
pub const EVENT_REFUNDS: [&str; 2] = ["refund.processed", "refund.created"];

/// A verified payment event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentEvent {
    /// Payment captured for an order
    Captured {
        /// Gateway order id
        order_id: String,
        /// Gateway payment id
        payment_id: Option<String>,
    },
    /// Payment attempt failed, or a captured payment was reversed
    Failed {
        /// Gateway order id
        order_id: String,
        /// Gateway payment id
        payment_id: Option<String>,
        /// Gateway-provided cause
        reason: Option<String>,
    },
    /// A captured payment was refunded
    Refunded {
        /// Gateway payment id the refund belongs to
        payment_id: String,
        /// Gateway refund id
        refund_id: Option<String>,
    },
    /// Any event the marketplace does not act on
    Unsupported {
        /// Event name as sent
        name: String,
    },
}

/// How to find the order an event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderReference<'a> {
    /// By gateway order id
    ExternalOrder(&'a str),
    /// By gateway payment id (refunds do not carry the order id)
    ExternalPayment(&'a str),
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: Payload,
}

#[derive(Deserialize, Default)]
struct Payload {
    payment: Option<Wrapped<PaymentEntity>>,
    refund: Option<Wrapped<RefundEntity>>,
}

#[derive(Deserialize)]
struct Wrapped<T> {
    entity: T,
}

#[derive(Deserialize)]
struct PaymentEntity {
    id: Option<String>,
    order_id: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct RefundEntity {
    id: Option<String>,
    payment_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl PaymentEvent {
    /// Parse the exact webhook body.
    ///
    /// # Errors
    ///
    /// [`MarketplaceError::Validation`] when the body is not JSON of the
    /// expected shape or a supported event lacks its order or payment id.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let envelope: Envelope = serde_json::from_slice(raw)
            .map_err(|e| MarketplaceError::validation(format!("malformed webhook payload: {e}")))?;

        let payment = envelope.payload.payment.map(|w| w.entity);
        let name = envelope.event;

        if name == EVENT_PAYMENT_CAPTURED || name == EVENT_PAYMENT_FAILED {
            let entity = payment.ok_or_else(|| MarketplaceError::validation("missing payment entity"))?;
            let order_id =
                non_empty(entity.order_id).ok_or_else(|| MarketplaceError::validation("missing order id"))?;
            let payment_id = non_empty(entity.id);
            return Ok(if name == EVENT_PAYMENT_CAPTURED {
                Self::Captured { order_id, payment_id }
            } else {
                Self::Failed {
                    order_id,
                    payment_id,
                    reason: non_empty(entity.error_description),
                }
            });
        }

        if EVENT_REFUNDS.contains(&name.as_str()) {
            let entity = envelope
                .payload
                .refund
                .map(|w| w.entity)
                .ok_or_else(|| MarketplaceError::validation("missing refund entity"))?;
            let payment_id = non_empty(entity.payment_id)
                .or_else(|| payment.and_then(|p| non_empty(p.id)))
                .ok_or_else(|| MarketplaceError::validation("missing payment id"))?;
            return Ok(Self::Refunded {
                payment_id,
                refund_id: non_empty(entity.id),
            });
        }

        Ok(Self::Unsupported { name })
    }

    /// Where to look the order up, or `None` for unsupported events.
    #[must_use]
    pub fn order_reference(&self) -> Option<OrderReference<'_>> {
        match self {
            Self::Captured { order_id, .. } | Self::Failed { order_id, .. } => {
                Some(OrderReference::ExternalOrder(order_id))
            }
            Self::Refunded { payment_id, .. } => Some(OrderReference::ExternalPayment(payment_id)),
            Self::Unsupported { .. } => None,
        }
    }

    /// Gateway payment id carried by the event.
    #[must_use]
    pub fn payment_id(&self) -> Option<&str> {
        match self {
            Self::Captured { payment_id, .. } | Self::Failed { payment_id, .. } => payment_id.as_deref(),
            Self::Refunded { payment_id, .. } => Some(payment_id),
            Self::Unsupported { .. } => None,
        }
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Captured { .. } => "captured",
            Self::Failed { .. } => "failed",
            Self::Refunded { .. } => "refunded",
            Self::Unsupported { .. } => "unsupported",
        }
    }
}

/// What the order pays for, as it currently stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetState {
    /// The paid-for entity
    pub target: OrderTarget,
    /// Its payment flag
    pub payment_status: bool,
    /// Its meeting URL (bookings only)
    pub meet_url: Option<String>,
}

impl TargetState {
    fn is_booking(&self) -> bool {
        matches!(self.target, OrderTarget::Booking(_))
    }

    /// A booking that still needs a meeting.
    #[must_use]
    pub fn needs_meeting(&self) -> bool {
        self.is_booking() && self.meet_url.as_deref().is_none_or(|url| url.trim().is_empty())
    }
}

/// Side effect requested by a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Create a meeting and store its URL with a guarded write
    ProvisionMeeting,
    /// Remove the booking's meeting URL
    ClearMeetUrl,
    /// Tell the participants the payment failed
    NotifyFailed {
        /// Gateway-provided cause
        reason: Option<String>,
    },
    /// Tell the participants the payment was refunded
    NotifyRefunded,
}

/// Effects of one transition; rarely more than three.
pub type Effects = SmallVec<[TransitionEffect; 3]>;

/// Outcome of [`plan_transition`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Move the order and the target's payment flag
    Apply {
        /// Status the compare-and-set expects
        from: OrderStatus,
        /// New status
        to: OrderStatus,
        /// New payment flag on the target
        payment_status: bool,
        /// Effects to run after the write commits
        effects: Effects,
    },
    /// The event was already applied; only recovery effects remain
    AlreadyApplied {
        /// Current status
        status: OrderStatus,
        /// Recovery effects
        effects: Effects,
    },
    /// Nothing to do; acknowledge and move on
    Ignore {
        /// Why
        reason: &'static str,
    },
}

/// Decide what `event` does to an order in `status` paying for `target`.
///
/// Captured: pending→completed and a meeting for bookings without one. A
/// duplicate capture only asks for the meeting while the URL is still
/// empty; the provisioning lease decides who actually calls the provider.
/// Failed: pending or completed→failed, clearing the URL. Refund:
/// completed→refunded, clearing the URL. Failed and refunded orders are
/// final.
///
/// Completed→failed breaks the otherwise strict rule that a completed order
/// only moves to refunded. It is accepted so a failure reported after the
/// capture (a reversal) still releases the booking instead of leaving a
/// paid flag the gateway has withdrawn.
#[must_use]
pub fn plan_transition(status: OrderStatus, event: &PaymentEvent, target: &TargetState) -> Transition {
    use OrderStatus::{Completed, Failed, Pending, Refunded};

    let provision = || -> Effects {
        let mut effects = Effects::new();
        if target.needs_meeting() {
            effects.push(TransitionEffect::ProvisionMeeting);
        }
        effects
    };
    let release = |notice: TransitionEffect| -> Effects {
        let mut effects = Effects::new();
        if target.is_booking() {
            effects.push(TransitionEffect::ClearMeetUrl);
        }
        effects.push(notice);
        effects
    };

    match (event, status) {
        (PaymentEvent::Unsupported { .. }, _) => Transition::Ignore {
            reason: "unsupported event",
        },

        (PaymentEvent::Captured { .. }, Pending) => Transition::Apply {
            from: Pending,
            to: Completed,
            payment_status: true,
            effects: provision(),
        },
        (PaymentEvent::Captured { .. }, Completed) => Transition::AlreadyApplied {
            status: Completed,
            effects: provision(),
        },
        (PaymentEvent::Captured { .. }, Failed | Refunded) => Transition::Ignore {
            reason: "capture for a closed order",
        },

        (PaymentEvent::Failed { reason, .. }, from @ (Pending | Completed)) => Transition::Apply {
            from,
            to: Failed,
            payment_status: false,
            effects: release(TransitionEffect::NotifyFailed { reason: reason.clone() }),
        },
        (PaymentEvent::Failed { .. }, Failed) => Transition::AlreadyApplied {
            status: Failed,
            effects: Effects::new(),
        },
        (PaymentEvent::Failed { .. }, Refunded) => Transition::Ignore {
            reason: "failure for a refunded order",
        },

        (PaymentEvent::Refunded { .. }, Completed) => Transition::Apply {
            from: Completed,
            to: Refunded,
            payment_status: false,
            effects: release(TransitionEffect::NotifyRefunded),
        },
        (PaymentEvent::Refunded { .. }, Refunded) => Transition::AlreadyApplied {
            status: Refunded,
            effects: Effects::new(),
        },
        (PaymentEvent::Refunded { .. }, Pending | Failed) => Transition::Ignore {
            reason: "refund for an uncaptured order",
        },
    }
}
