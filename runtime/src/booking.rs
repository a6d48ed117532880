//! Booking order coordination.
//!
//! Turns a requested slot into a booking that holds the slot plus a pending
//! payment order, or, for free sessions, into a confirmed booking with its
//! meeting. The fast conflict check here only saves a transaction; the
//! authoritative check runs again inside [`BookingStore::insert_booking`].
//!
//! [`BookingStore::insert_booking`]: mentorlink_core::ports::BookingStore::insert_booking

use chrono::NaiveDate;
use mentorlink_core::availability::{enabled_day, fits_availability, open_slots};
use mentorlink_core::conflict::{Candidate, first_conflict};
use mentorlink_core::time_of_day::local_to_utc;
use mentorlink_core::types::{
    Booking, BookingId, ContactInfo, EventTypeId, MentorId, OrderId, OrderTarget, PaymentOrder, StudentId,
};
use mentorlink_core::{MarketplaceError, StoreError, TimeOfDay};
use serde::{Deserialize, Serialize};

use crate::MarketplaceEnvironment;
use crate::metrics::BookingMetrics;
use crate::provisioning::BookingMeetings;

/// Longest session that can be booked.
pub const MAX_SESSION_MINUTES: u32 = 480;

/// A request for a one-to-one session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Mentor to book
    pub mentor_id: MentorId,
    /// Event type booked under
    pub event_id: EventTypeId,
    /// Session date (mentor-local)
    pub date: NaiveDate,
    /// Session start (mentor-local)
    pub time: TimeOfDay,
    /// Session length
    pub duration_minutes: u32,
    /// Requester contact details
    pub contact: ContactInfo,
    /// Registered student, if any
    #[serde(default)]
    pub student_id: Option<StudentId>,
    /// Gateway order created by the payment collaborator (paid sessions)
    #[serde(default)]
    pub external_order_id: Option<String>,
    /// Free sessions skip the payment step
    #[serde(default)]
    pub free_session: bool,
}

/// Where the requester goes to pay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHandle {
    /// Our order id
    pub order_id: OrderId,
    /// Gateway order id to redirect to
    pub external_order_id: String,
    /// The slot-holding booking
    pub booking_id: BookingId,
}

/// Result of a successful booking request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookingOutcome {
    /// Paid session; the slot is held until the gateway reports back
    AwaitingPayment(OrderHandle),
    /// Free session, booked and (when the provider answered) provisioned
    Confirmed {
        /// The booking
        booking_id: BookingId,
        /// Its meeting, unless provisioning failed and awaits recovery
        meet_url: Option<String>,
    },
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Check a request's shape before anything is loaded.
///
/// # Errors
///
/// [`MarketplaceError::Validation`] naming the first problem found.
pub fn validate(request: &BookingRequest) -> Result<(), MarketplaceError> {
    if request.duration_minutes == 0 || request.duration_minutes > MAX_SESSION_MINUTES {
        return Err(MarketplaceError::validation(format!(
            "duration must be between 1 and {MAX_SESSION_MINUTES} minutes"
        )));
    }
    if request.time.checked_add_minutes(request.duration_minutes).is_none() {
        return Err(MarketplaceError::validation("session must end by midnight"));
    }
    if request.contact.name.trim().is_empty() {
        return Err(MarketplaceError::validation("contact name is required"));
    }
    if !is_plausible_email(request.contact.email.trim()) {
        return Err(MarketplaceError::validation("contact email is invalid"));
    }
    if !request.free_session
        && request
            .external_order_id
            .as_deref()
            .is_none_or(|id| id.trim().is_empty())
    {
        return Err(MarketplaceError::validation("paid sessions need an external order id"));
    }
    Ok(())
}

/// Coordinates booking requests.
#[derive(Clone)]
pub struct BookingOrderCoordinator {
    env: MarketplaceEnvironment,
    meetings: BookingMeetings,
}

impl BookingOrderCoordinator {
    /// Create a coordinator.
    #[must_use]
    pub const fn new(env: MarketplaceEnvironment, meetings: BookingMeetings) -> Self {
        Self { env, meetings }
    }

    /// Book a slot.
    ///
    /// # Errors
    ///
    /// - [`MarketplaceError::Validation`] for malformed requests, past slots
    ///   or slots outside the mentor's windows
    /// - [`MarketplaceError::NoAvailability`] when the mentor has nothing
    ///   configured for that day
    /// - [`MarketplaceError::Conflict`] when the slot is held
    /// - [`MarketplaceError::Persistence`] on storage failure
    pub async fn request_booking(&self, request: BookingRequest) -> Result<BookingOutcome, MarketplaceError> {
        let result = self.book(request).await;
        BookingMetrics::record(match &result {
            Ok(BookingOutcome::AwaitingPayment(_)) => "awaiting_payment",
            Ok(BookingOutcome::Confirmed { .. }) => "confirmed",
            Err(MarketplaceError::Conflict { .. }) => "conflict",
            Err(MarketplaceError::Persistence(_)) => "error",
            Err(_) => "rejected",
        });
        result
    }

    /// Bookable start times for `mentor_id` on `date`: resolved from the
    /// mentor's windows, minus slots that clash with a held booking or have
    /// already started. Empty when the mentor has nothing configured.
    ///
    /// # Errors
    ///
    /// - [`MarketplaceError::Validation`] for an out-of-range duration
    /// - [`MarketplaceError::Persistence`] on storage failure
    pub async fn open_slots(
        &self,
        mentor_id: MentorId,
        date: NaiveDate,
        duration_minutes: u32,
    ) -> Result<Vec<TimeOfDay>, MarketplaceError> {
        if duration_minutes == 0 || duration_minutes > MAX_SESSION_MINUTES {
            return Err(MarketplaceError::validation(format!(
                "duration must be between 1 and {MAX_SESSION_MINUTES} minutes"
            )));
        }
        let Some(availability) = self.env.mentors.availability(mentor_id).await? else {
            return Ok(Vec::new());
        };
        if enabled_day(&availability, date).is_none() {
            return Ok(Vec::new());
        }

        let existing = self.env.bookings.slot_holding_bookings(mentor_id, date).await?;
        let now = self.env.clock.now();
        let offset = self.meetings.settings().utc_offset;
        Ok(open_slots(&availability, date, duration_minutes, &existing)
            .into_iter()
            .filter(|slot| local_to_utc(slot.on(date), offset) > now)
            .collect())
    }

    async fn book(&self, request: BookingRequest) -> Result<BookingOutcome, MarketplaceError> {
        validate(&request)?;

        let now = self.env.clock.now();
        let starts_at = local_to_utc(request.time.on(request.date), self.meetings.settings().utc_offset);
        if starts_at <= now {
            return Err(MarketplaceError::validation("slot is in the past"));
        }

        let availability = self
            .env
            .mentors
            .availability(request.mentor_id)
            .await?
            .filter(|availability| enabled_day(availability, request.date).is_some())
            .ok_or(MarketplaceError::NoAvailability {
                mentor_id: request.mentor_id,
                date: request.date,
            })?;

        if !fits_availability(&availability, request.date, request.time, request.duration_minutes) {
            return Err(MarketplaceError::validation("slot is outside the mentor's availability"));
        }

        let conflict = || MarketplaceError::Conflict {
            mentor_id: request.mentor_id,
            date: request.date,
            time: request.time,
        };

        let candidate = Candidate {
            date: request.date,
            time: request.time,
            duration_minutes: request.duration_minutes,
        };
        let existing = self
            .env
            .bookings
            .slot_holding_bookings(request.mentor_id, request.date)
            .await?;
        if let Some(clash) = first_conflict(&candidate, &existing) {
            tracing::info!(
                mentor_id = %request.mentor_id,
                date = %request.date,
                time = %request.time,
                clashes_with = %clash.id,
                "Requested slot is held"
            );
            return Err(conflict());
        }

        let booking = Booking {
            id: BookingId::new(),
            mentor_id: request.mentor_id,
            student_id: request.student_id,
            event_id: request.event_id,
            date: request.date,
            time: request.time,
            duration_minutes: request.duration_minutes,
            payment_status: request.free_session,
            meet_url: None,
            completed: false,
            is_free_session: request.free_session,
            contact: ContactInfo {
                name: request.contact.name.trim().to_string(),
                email: request.contact.email.trim().to_string(),
                phone: request.contact.phone.clone(),
            },
            created_at: now,
        };

        let order = match (&request.external_order_id, request.free_session) {
            (Some(external), false) => Some(PaymentOrder::pending(
                external.trim(),
                OrderTarget::Booking(booking.id),
                now,
            )),
            _ => None,
        };
        let handle = order.as_ref().map(|order| OrderHandle {
            order_id: order.id,
            external_order_id: order.external_order_id.clone(),
            booking_id: booking.id,
        });

        self.env
            .bookings
            .insert_booking(booking.clone(), order)
            .await
            .map_err(|e| match e {
                StoreError::SlotTaken(holder) => {
                    tracing::info!(
                        mentor_id = %request.mentor_id,
                        date = %request.date,
                        holder = %holder,
                        "Slot taken by a concurrent booking"
                    );
                    conflict()
                }
                StoreError::DuplicateOrder(external) => {
                    tracing::info!(external_order_id = %external, "Booking request reused a gateway order id");
                    MarketplaceError::validation(format!("order {external} is already attached to a booking"))
                }
                other => other.into(),
            })?;

        if let Some(handle) = handle {
            tracing::info!(
                booking_id = %handle.booking_id,
                order_id = %handle.order_id,
                mentor_id = %request.mentor_id,
                "Booking awaiting payment"
            );
            return Ok(BookingOutcome::AwaitingPayment(handle));
        }

        tracing::info!(booking_id = %booking.id, mentor_id = %request.mentor_id, "Free session booked");
        let meet_url = match self.meetings.ensure_meeting(&booking).await {
            Ok(outcome) => outcome.url().map(str::to_owned),
            Err(e) => {
                tracing::warn!(
                    booking_id = %booking.id,
                    error = %e,
                    "Free session booked without a meeting, leaving it for recovery"
                );
                None
            }
        };
        Ok(BookingOutcome::Confirmed {
            booking_id: booking.id,
            meet_url,
        })
    }
}
