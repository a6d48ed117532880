//! Builders for common test data and a wired-up test marketplace.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Fixture inputs are literals

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use mentorlink_core::TimeOfDay;
use mentorlink_core::types::{
    Availability, Booking, BookingId, ContactInfo, EventTypeId, MentorId, OrderStatus, OrderTarget, PaymentOrder,
    ScheduleDay, ScheduleEntry, TimeRange, Workshop, WorkshopId,
};
use mentorlink_runtime::retry::RetryPolicy;
use mentorlink_runtime::{
    BookingMeetings, BookingOrderCoordinator, BookingRequest, MarketplaceEnvironment, MeetingSettings,
    PaymentWebhookProcessor, WebhookSecret,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::meet::ScriptedProvisioner;
use crate::mocks::MockClock;
use crate::notifier::RecordingNotifier;
use crate::store::InMemoryMarketplace;

/// Secret the harness signs webhook bodies with.
pub const WEBHOOK_SECRET: &str = "whsec_test";

/// Fixed "now" for tests: Sunday 2025-06-01 08:00 UTC.
#[must_use]
pub fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// The Monday after [`now`].
#[must_use]
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

/// Parse a `"hh:mm AM"` literal.
#[must_use]
pub fn time(s: &str) -> TimeOfDay {
    TimeOfDay::parse(s).unwrap()
}

/// Availability on Mondays 09:00–12:00 and 14:00–17:00.
#[must_use]
pub fn weekday_availability(mentor_id: MentorId) -> Availability {
    Availability::new(mentor_id).with_day(
        Weekday::Mon,
        vec![TimeRange::new(9 * 60, 12 * 60).unwrap(), TimeRange::new(14 * 60, 17 * 60).unwrap()],
    )
}

/// Contact details for a student.
#[must_use]
pub fn contact(name: &str) -> ContactInfo {
    ContactInfo {
        name: name.to_string(),
        email: format!("{}@students.test", name.to_lowercase()),
        phone: None,
    }
}

/// An unpaid, non-free booking.
#[must_use]
pub fn booking(mentor_id: MentorId, date: NaiveDate, at: &str, duration_minutes: u32) -> Booking {
    Booking {
        id: BookingId::new(),
        mentor_id,
        student_id: None,
        event_id: EventTypeId::new(),
        date,
        time: time(at),
        duration_minutes,
        payment_status: false,
        meet_url: None,
        completed: false,
        is_free_session: false,
        contact: contact("Ada"),
        created_at: now(),
    }
}

/// A paid booking without a meeting URL.
#[must_use]
pub fn paid_booking(mentor_id: MentorId, date: NaiveDate, at: &str, duration_minutes: u32) -> Booking {
    Booking {
        payment_status: true,
        ..booking(mentor_id, date, at, duration_minutes)
    }
}

/// A pending order for `target`.
#[must_use]
pub fn pending_order(external_order_id: &str, target: OrderTarget) -> PaymentOrder {
    PaymentOrder::pending(external_order_id, target, now())
}

/// An order already in `status`, with a payment id.
#[must_use]
pub fn order_in(status: OrderStatus, external_order_id: &str, payment_id: &str, target: OrderTarget) -> PaymentOrder {
    PaymentOrder {
        status,
        external_payment_id: Some(payment_id.to_string()),
        ..pending_order(external_order_id, target)
    }
}

/// A paid-session booking request.
#[must_use]
pub fn booking_request(mentor_id: MentorId, date: NaiveDate, at: &str, external_order_id: &str) -> BookingRequest {
    BookingRequest {
        mentor_id,
        event_id: EventTypeId::new(),
        date,
        time: time(at),
        duration_minutes: 30,
        contact: contact("Ada"),
        student_id: None,
        external_order_id: Some(external_order_id.to_string()),
        free_session: false,
    }
}

/// A free-session booking request.
#[must_use]
pub fn free_request(mentor_id: MentorId, date: NaiveDate, at: &str) -> BookingRequest {
    BookingRequest {
        external_order_id: None,
        free_session: true,
        ..booking_request(mentor_id, date, at, "unused")
    }
}

/// Active workshop with one session per day from `starts_on`, at `at`.
#[must_use]
pub fn daily_workshop(mentor_id: MentorId, starts_on: NaiveDate, at: &str, days: u32) -> Workshop {
    Workshop {
        id: WorkshopId::new(),
        mentor_id,
        title: "Rust in Production".to_string(),
        number_of_days: days,
        session_minutes: 90,
        schedule: (0..days)
            .map(|i| ScheduleEntry {
                day: ScheduleDay::Date(starts_on + chrono::TimeDelta::days(i64::from(i))),
                time: time(at),
            })
            .collect(),
        meet_links: std::collections::BTreeMap::new(),
        active: true,
        starts_on: Some(starts_on),
    }
}

/// `payment.captured` body.
#[must_use]
pub fn captured_body(order_id: &str, payment_id: &str) -> Vec<u8> {
    json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": payment_id, "order_id": order_id, "status": "captured" } } }
    })
    .to_string()
    .into_bytes()
}

/// `payment.failed` body.
#[must_use]
pub fn failed_body(order_id: &str, payment_id: &str, reason: &str) -> Vec<u8> {
    json!({
        "event": "payment.failed",
        "payload": { "payment": { "entity": {
            "id": payment_id, "order_id": order_id, "status": "failed", "error_description": reason
        } } }
    })
    .to_string()
    .into_bytes()
}

/// `refund.processed` body.
#[must_use]
pub fn refund_body(payment_id: &str, refund_id: &str) -> Vec<u8> {
    json!({
        "event": "refund.processed",
        "payload": { "refund": { "entity": { "id": refund_id, "payment_id": payment_id } } }
    })
    .to_string()
    .into_bytes()
}

/// Retry policy without sleeps, so tests do not wait on backoff.
#[must_use]
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::builder()
        .max_attempts(max_attempts)
        .initial_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(1))
        .jitter(false)
        .build()
}

/// Every collaborator wired together around an in-memory store.
#[derive(Clone, Debug)]
pub struct TestMarketplace {
    /// Backing store
    pub store: Arc<InMemoryMarketplace>,
    /// Meeting provider
    pub provisioner: ScriptedProvisioner,
    /// Notifications sent
    pub notifier: RecordingNotifier,
    /// Controllable clock, starting at [`now`]
    pub clock: MockClock,
    /// Environment handed to the components
    pub env: MarketplaceEnvironment,
}

impl Default for TestMarketplace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestMarketplace {
    /// Fresh marketplace.
    #[must_use]
    pub fn new() -> Self {
        Self::with_provisioner(ScriptedProvisioner::new())
    }

    /// Fresh marketplace around a preconfigured provider.
    #[must_use]
    pub fn with_provisioner(provisioner: ScriptedProvisioner) -> Self {
        let store = Arc::new(InMemoryMarketplace::new());
        let notifier = RecordingNotifier::new();
        let clock = MockClock::new(now());
        let env = MarketplaceEnvironment::from_store(
            store.clone(),
            Arc::new(provisioner.clone()),
            Arc::new(notifier.clone()),
            Arc::new(clock.clone()),
        );
        Self {
            store,
            provisioner,
            notifier,
            clock,
            env,
        }
    }

    /// Meeting settings with a fast retry policy.
    #[must_use]
    pub fn meeting_settings(&self) -> MeetingSettings {
        MeetingSettings {
            call_timeout: Duration::from_secs(5),
            retry: fast_retry(3),
            ..MeetingSettings::default()
        }
    }

    /// Booking meeting service.
    #[must_use]
    pub fn meetings(&self) -> BookingMeetings {
        BookingMeetings::new(self.env.clone(), self.meeting_settings())
    }

    /// Booking coordinator.
    #[must_use]
    pub fn coordinator(&self) -> BookingOrderCoordinator {
        BookingOrderCoordinator::new(self.env.clone(), self.meetings())
    }

    /// Webhook processor using [`WEBHOOK_SECRET`].
    #[must_use]
    pub fn webhooks(&self) -> PaymentWebhookProcessor {
        PaymentWebhookProcessor::new(self.env.clone(), WebhookSecret::new(WEBHOOK_SECRET), self.meetings())
    }

    /// Hex signature for `body` under [`WEBHOOK_SECRET`].
    #[must_use]
    pub fn sign(&self, body: &[u8]) -> String {
        WebhookSecret::new(WEBHOOK_SECRET).sign(body).unwrap()
    }

    /// Register a mentor with [`weekday_availability`].
    #[must_use]
    pub fn mentor(&self) -> MentorId {
        let mentor_id = MentorId::new();
        self.store
            .add_mentor(mentor_id, "mentor@mentors.test", Some(weekday_availability(mentor_id)));
        mentor_id
    }
}
