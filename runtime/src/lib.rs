//! # MentorLink Runtime
//!
//! The imperative shell around `mentorlink-core`: it loads state through the
//! store ports, asks the pure functions what to do, applies the answer and
//! talks to remote collaborators.
//!
//! - [`booking::BookingOrderCoordinator`] turns a requested slot into a
//!   pending booking plus payment order
//! - [`webhook::PaymentWebhookProcessor`] verifies gateway events and applies
//!   them as idempotent order transitions
//! - [`workshop_links::WorkshopLinkJob`] provisions upcoming workshop links
//! - [`recovery::BookingLinkRecovery`] retries bookings left without a link
//!
//! Every component takes a [`MarketplaceEnvironment`] of trait objects.

use mentorlink_core::Clock;
use mentorlink_core::ports::{
    BookingStore, JobRunMarker, MeetingProvisioner, MentorDirectory, Notifier, PaymentOrderStore, WorkshopStore,
};
use std::sync::Arc;

pub mod booking;
pub mod metrics;
pub mod notify;
pub mod periodic;
pub mod provisioning;
pub mod recovery;
pub mod retry;
pub mod signature;
pub mod webhook;
pub mod workshop_links;

pub use booking::{BookingOrderCoordinator, BookingOutcome, BookingRequest, OrderHandle};
pub use notify::TracingNotifier;
pub use provisioning::{BookingMeetings, MeetingOutcome, MeetingSettings};
pub use recovery::BookingLinkRecovery;
pub use retry::RetryPolicy;
pub use signature::WebhookSecret;
pub use webhook::{PaymentWebhookProcessor, WebhookOutcome};
pub use workshop_links::{WorkshopLinkJob, WorkshopLinkJobConfig};

/// Injected collaborators.
#[derive(Clone)]
pub struct MarketplaceEnvironment {
    /// Mentor lookups
    pub mentors: Arc<dyn MentorDirectory>,
    /// Booking persistence
    pub bookings: Arc<dyn BookingStore>,
    /// Payment order persistence
    pub orders: Arc<dyn PaymentOrderStore>,
    /// Workshop persistence
    pub workshops: Arc<dyn WorkshopStore>,
    /// Debounce markers for periodic jobs
    pub job_runs: Arc<dyn JobRunMarker>,
    /// Meeting provider
    pub provisioner: Arc<dyn MeetingProvisioner>,
    /// Notification collaborator
    pub notifier: Arc<dyn Notifier>,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl MarketplaceEnvironment {
    /// Wire every store port to one backing store.
    #[must_use]
    pub fn from_store<S>(
        store: Arc<S>,
        provisioner: Arc<dyn MeetingProvisioner>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        S: MentorDirectory + BookingStore + PaymentOrderStore + WorkshopStore + JobRunMarker + 'static,
    {
        Self {
            mentors: store.clone(),
            bookings: store.clone(),
            orders: store.clone(),
            workshops: store.clone(),
            job_runs: store,
            provisioner,
            notifier,
            clock,
        }
    }
}

impl std::fmt::Debug for MarketplaceEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceEnvironment").finish_non_exhaustive()
    }
}
