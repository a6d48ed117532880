//! Collaborator traits.
//!
//! Everything the marketplace reads, writes or calls lives behind these
//! traits, so the coordinator, the webhook processor and the batch job can run
//! against PostgreSQL in production and in-memory doubles in tests.
//!
//! # Design
//!
//! The traits return `Pin<Box<dyn Future>>` instead of using `async fn` so
//! they stay object safe; the shell holds them as `Arc<dyn Trait>`.
//!
//! Stores never hold a lock across a call to a remote collaborator. Any
//! locking they need (the per mentor+date booking check, the workshop link
//! merge) lives inside one transaction of one method.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use crate::error::{RemoteServiceError, StoreError};
use crate::types::{
    Availability, Booking, BookingId, MeetLink, MentorId, OrderId, OrderStatus, OrderTarget, PaymentOrder, Workshop,
    WorkshopId,
};
use crate::webhook::TargetState;

/// Future returned by every store method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Future returned by remote collaborators.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteServiceError>> + Send + 'a>>;

/// Mentor profile lookups.
pub trait MentorDirectory: Send + Sync {
    /// The mentor's weekly availability, if configured.
    fn availability(&self, mentor_id: MentorId) -> StoreFuture<'_, Option<Availability>>;

    /// The mentor's meeting invite address.
    fn mentor_email(&self, mentor_id: MentorId) -> StoreFuture<'_, Option<String>>;
}

/// One-to-one booking persistence.
///
/// A booking *holds its slot* while it is a free session, is paid, or its
/// payment order is still pending.
pub trait BookingStore: Send + Sync {
    /// Slot-holding bookings of `mentor_id` on `date` and the days either
    /// side of it, so sessions spilling over midnight are seen.
    fn slot_holding_bookings(&self, mentor_id: MentorId, date: NaiveDate) -> StoreFuture<'_, Vec<Booking>>;

    /// Insert `booking` (and its pending `order`, for paid sessions) in one
    /// transaction serialized per mentor+date.
    ///
    /// Inside that transaction the store re-reads the slot-holding bookings
    /// and runs the conflict check again; this is the only mutual-exclusion
    /// point for slots.
    ///
    /// # Errors
    ///
    /// [`StoreError::SlotTaken`] carrying the clashing booking id when the
    /// slot was taken since the caller last looked, and
    /// [`StoreError::DuplicateOrder`] when the gateway order id is already
    /// recorded.
    fn insert_booking(&self, booking: Booking, order: Option<PaymentOrder>) -> StoreFuture<'_, ()>;

    /// Load a booking.
    fn booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>>;

    /// Guarded write: store `meet_url` only while the booking has none and
    /// is still paid or free.
    ///
    /// Returns whether this call wrote it.
    fn set_meet_url_if_empty(&self, id: BookingId, meet_url: String) -> StoreFuture<'_, bool>;

    /// Take the provisioning lease of a paid or free booking that has no
    /// meeting URL. Succeeds when nobody holds the lease or the holder took
    /// it `lease` or more before `now`.
    ///
    /// Returns whether this call holds the lease now.
    fn claim_provisioning(&self, id: BookingId, now: DateTime<Utc>, lease: TimeDelta) -> StoreFuture<'_, bool>;

    /// Drop the provisioning lease so the next caller can try at once.
    fn release_provisioning(&self, id: BookingId) -> StoreFuture<'_, ()>;

    /// Paid or free bookings on or after `from` that have no meeting URL
    /// yet, oldest first.
    fn bookings_missing_meet_url(&self, from: NaiveDate, limit: u32) -> StoreFuture<'_, Vec<Booking>>;
}

/// A status change computed by the transition function, ready to apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderTransition {
    /// Status the compare-and-set expects
    pub from: OrderStatus,
    /// New status
    pub to: OrderStatus,
    /// Entity whose payment flag moves with the order
    pub target: OrderTarget,
    /// New payment flag
    pub payment_status: bool,
    /// Gateway payment id to record, if the event carried one
    pub payment_id: Option<String>,
    /// Whether the booking's meeting URL is cleared in the same write
    pub clear_meet_url: bool,
    /// Time of the change
    pub at: DateTime<Utc>,
}

/// Payment order persistence.
pub trait PaymentOrderStore: Send + Sync {
    /// Order by gateway order id.
    fn order_by_external_id(&self, external_order_id: String) -> StoreFuture<'_, Option<PaymentOrder>>;

    /// Order by gateway payment id.
    fn order_by_payment_id(&self, payment_id: String) -> StoreFuture<'_, Option<PaymentOrder>>;

    /// Current state of the entity an order pays for.
    fn target_state(&self, target: OrderTarget) -> StoreFuture<'_, Option<TargetState>>;

    /// Compare-and-set the order status and update its target atomically.
    ///
    /// Returns `false`, with nothing written, when the order is no longer in
    /// `transition.from`.
    fn apply_transition(&self, order_id: OrderId, transition: OrderTransition) -> StoreFuture<'_, bool>;
}

/// Result of merging provisioned links into a workshop.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Keys this merge wrote
    pub written: Vec<String>,
    /// Keys already populated by someone else, left untouched
    pub skipped: Vec<String>,
}

/// Workshop persistence.
pub trait WorkshopStore: Send + Sync {
    /// Active workshops with at least one paid enrollment, ordered by id,
    /// starting after `after`.
    fn active_paid_workshops(&self, after: Option<WorkshopId>, limit: u32) -> StoreFuture<'_, Vec<Workshop>>;

    /// Invite addresses of the paid enrollments.
    fn attendee_emails(&self, workshop_id: WorkshopId) -> StoreFuture<'_, Vec<String>>;

    /// Record `starts_on` as the date the weekday schedule counts from,
    /// unless the workshop already has one. Returns the stored anchor.
    fn anchor_schedule(&self, workshop_id: WorkshopId, starts_on: NaiveDate) -> StoreFuture<'_, NaiveDate>;

    /// Lock the workshop, re-read its links and add only the absent keys.
    fn merge_meet_links(
        &self,
        workshop_id: WorkshopId,
        links: BTreeMap<String, MeetLink>,
    ) -> StoreFuture<'_, MergeOutcome>;
}

/// Persisted debounce marker for periodic jobs.
pub trait JobRunMarker: Send + Sync {
    /// Record a run of `job` starting at `now` unless the previous run
    /// started less than `cooldown` earlier. Returns whether the run may go
    /// ahead. Atomic across instances.
    fn try_begin(&self, job: &'static str, now: DateTime<Utc>, cooldown: TimeDelta) -> StoreFuture<'_, bool>;
}

/// Liveness of the backing store, for readiness checks.
pub trait ReadinessProbe: Send + Sync {
    /// Succeeds when the store answers a trivial query.
    fn ping(&self) -> StoreFuture<'_, ()>;
}

/// What to schedule with the meeting provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeetingRequest {
    /// Meeting title shown to participants
    pub title: String,
    /// Absolute start
    pub start: DateTime<Utc>,
    /// Length
    pub duration_minutes: u32,
    /// Invite addresses
    pub attendees: Vec<String>,
}

/// A meeting the provider created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvisionedMeeting {
    /// Joinable URL
    pub join_url: String,
    /// Provider-side id, when returned
    pub meeting_id: Option<String>,
}

/// External meeting-link provider.
pub trait MeetingProvisioner: Send + Sync {
    /// Create one meeting. A single external call; callers own retries and
    /// timeouts.
    fn create_meeting(&self, request: MeetingRequest) -> RemoteFuture<'_, ProvisionedMeeting>;
}

/// Something participants should hear about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// A booking's meeting is ready
    MeetingReady {
        /// Booking
        booking_id: BookingId,
        /// Joinable URL
        meet_url: String,
    },
    /// Payment for an order failed or was reversed
    PaymentFailed {
        /// Order
        order_id: OrderId,
        /// What it paid for
        target: OrderTarget,
        /// Gateway-provided cause
        reason: Option<String>,
    },
    /// Payment for an order was refunded
    PaymentRefunded {
        /// Order
        order_id: OrderId,
        /// What it paid for
        target: OrderTarget,
    },
}

/// Notification collaborator; message content is its concern.
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    fn notify(&self, notification: Notification) -> RemoteFuture<'_, ()>;
}
