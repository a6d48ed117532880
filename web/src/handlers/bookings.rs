//! Booking endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use mentorlink_core::types::{BookingId, MentorId, OrderId};
use mentorlink_core::TimeOfDay;
use mentorlink_runtime::{BookingOutcome, BookingRequest};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Slot length used when the query leaves it out.
pub const DEFAULT_SLOT_MINUTES: u32 = 30;

/// Body of a successful booking request.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BookingResponse {
    /// Paid session; the client redirects to the gateway order
    AwaitingPayment {
        /// Our order id
        order_id: OrderId,
        /// Gateway order id
        external_order_id: String,
        /// The slot-holding booking
        booking_id: BookingId,
    },
    /// Free session
    Confirmed {
        /// The booking
        booking_id: BookingId,
        /// Its meeting, when the provider answered
        meet_url: Option<String>,
    },
}

impl From<BookingOutcome> for BookingResponse {
    fn from(outcome: BookingOutcome) -> Self {
        match outcome {
            BookingOutcome::AwaitingPayment(handle) => Self::AwaitingPayment {
                order_id: handle.order_id,
                external_order_id: handle.external_order_id,
                booking_id: handle.booking_id,
            },
            BookingOutcome::Confirmed { booking_id, meet_url } => Self::Confirmed { booking_id, meet_url },
        }
    }
}

/// Book a slot.
///
/// # Endpoint
///
/// ```text
/// POST /api/bookings
/// ```
///
/// # Errors
///
/// 409 when the slot is held, 422 for invalid requests or a day without
/// availability, 500 on storage failure.
pub async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let outcome = state.coordinator.request_booking(request).await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// Query string of the slot listing.
#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    /// Mentor-local date
    pub date: NaiveDate,
    /// Session length in minutes
    pub duration: Option<u32>,
}

/// Bookable starts for one day.
#[derive(Debug, Serialize, Deserialize)]
pub struct SlotsResponse {
    /// The day asked about
    pub date: NaiveDate,
    /// Start labels such as `"09:00 AM"`
    pub slots: Vec<TimeOfDay>,
}

/// List open slots.
///
/// # Endpoint
///
/// ```text
/// GET /api/mentors/:mentor_id/slots?date=YYYY-MM-DD&duration=N
/// ```
///
/// # Errors
///
/// 422 for an out-of-range duration, 500 on storage failure.
pub async fn list_slots(
    State(state): State<AppState>,
    Path(mentor_id): Path<MentorId>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let duration = query.duration.unwrap_or(DEFAULT_SLOT_MINUTES);
    let slots = state.coordinator.open_slots(mentor_id, query.date, duration).await?;
    Ok(Json(SlotsResponse {
        date: query.date,
        slots,
    }))
}
