//! Domain types for the mentorship marketplace.
//!
//! Identifiers, availability configuration, bookings, payment orders and the
//! entities an order can pay for, plus workshops and their meeting links.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use uuid::Uuid;

use crate::time_of_day::{MINUTES_PER_DAY, TimeOfDay};

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a mentor
    MentorId
);
uuid_id!(
    /// Unique identifier for a student
    StudentId
);
uuid_id!(
    /// Unique identifier for a mentor's bookable event type
    EventTypeId
);
uuid_id!(
    /// Unique identifier for a booking
    BookingId
);
uuid_id!(
    /// Unique identifier for a payment order
    OrderId
);
uuid_id!(
    /// Unique identifier for a workshop enrollment
    EnrollmentId
);
uuid_id!(
    /// Unique identifier for a workshop
    WorkshopId
);
uuid_id!(
    /// Unique identifier for a paid referral request
    ReferralRequestId
);

// ============================================================================
// Availability
// ============================================================================

/// A bookable window within a day, in minutes since midnight.
///
/// `end` may equal 1440 so a window can run up to midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// First bookable minute.
    pub start: u16,
    /// Minute the window closes (exclusive).
    pub end: u16,
}

impl TimeRange {
    /// Build a range; `None` unless `start < end <= 1440`.
    #[must_use]
    pub const fn new(start: u16, end: u16) -> Option<Self> {
        if start < end && end <= MINUTES_PER_DAY {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Build a range from two clock readings.
    #[must_use]
    pub const fn between(start: TimeOfDay, end: TimeOfDay) -> Option<Self> {
        Self::new(start.minutes(), end.minutes())
    }

    /// Whether `[start, start + duration)` fits inside this range.
    #[must_use]
    pub fn contains_slot(&self, start: TimeOfDay, duration_minutes: u32) -> bool {
        let start = u32::from(start.minutes());
        start >= u32::from(self.start) && start + duration_minutes <= u32::from(self.end)
    }
}

/// Availability for one weekday.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    /// Whether the mentor takes bookings on this weekday.
    pub enabled: bool,
    /// Bookable windows, in configuration order.
    #[serde(default)]
    pub ranges: Vec<TimeRange>,
}

/// A mentor's weekly availability configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Owning mentor.
    pub mentor_id: MentorId,
    /// Per-weekday configuration. Missing weekdays are unavailable.
    #[serde(default)]
    pub days: HashMap<Weekday, DayAvailability>,
    /// Mandatory idle gap between consecutive sessions.
    #[serde(default)]
    pub buffer_minutes: u32,
}

impl Availability {
    /// Empty configuration (no bookable days).
    #[must_use]
    pub fn new(mentor_id: MentorId) -> Self {
        Self {
            mentor_id,
            days: HashMap::new(),
            buffer_minutes: 0,
        }
    }

    /// Enable a weekday with the given windows.
    #[must_use]
    pub fn with_day(mut self, weekday: Weekday, ranges: Vec<TimeRange>) -> Self {
        self.days.insert(
            weekday,
            DayAvailability {
                enabled: true,
                ranges,
            },
        );
        self
    }

    /// Set the buffer between sessions.
    #[must_use]
    pub const fn with_buffer(mut self, buffer_minutes: u32) -> Self {
        self.buffer_minutes = buffer_minutes;
        self
    }

    /// Configuration for a weekday, if present.
    #[must_use]
    pub fn day(&self, weekday: Weekday) -> Option<&DayAvailability> {
        self.days.get(&weekday)
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// Who asked for the booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Display name.
    pub name: String,
    /// Email address; also the student's meeting invite address.
    pub email: String,
    /// Optional phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A one-to-one mentoring session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking ID
    pub id: BookingId,
    /// Mentor being booked
    pub mentor_id: MentorId,
    /// Registered student, if the requester has an account
    pub student_id: Option<StudentId>,
    /// Event type the slot was booked under
    pub event_id: EventTypeId,
    /// Session date (mentor-local)
    pub date: NaiveDate,
    /// Session start (mentor-local)
    pub time: TimeOfDay,
    /// Session length
    pub duration_minutes: u32,
    /// Whether the session has been paid for
    pub payment_status: bool,
    /// Joinable meeting URL, set once provisioned
    pub meet_url: Option<String>,
    /// Whether the session took place
    pub completed: bool,
    /// Free sessions skip the payment step
    pub is_free_session: bool,
    /// Requester contact details
    pub contact: ContactInfo,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Local start of the session.
    #[must_use]
    pub fn start(&self) -> NaiveDateTime {
        self.time.on(self.date)
    }

    /// Local end of the session, using this booking's own duration.
    #[must_use]
    pub fn end(&self) -> NaiveDateTime {
        self.start() + TimeDelta::minutes(i64::from(self.duration_minutes))
    }
}

// ============================================================================
// Payment orders
// ============================================================================

/// Lifecycle of a payment order.
///
/// ```text
/// pending ──captured──▶ completed ──refund──▶ refunded
///    │                      │
///    └──failed──▶ failed ◀──┘ (reversal)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Awaiting the gateway
    Pending,
    /// Payment captured
    Completed,
    /// Payment failed or was reversed
    Failed,
    /// Captured payment was refunded
    Refunded,
}

impl OrderStatus {
    /// Convert status to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// Parse status from database string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    /// Whether the order can move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed | Self::Failed)
                | (Self::Completed, Self::Failed | Self::Refunded)
        )
    }

    /// Failed and refunded orders never move again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Refunded)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single entity a payment order pays for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OrderTarget {
    /// A one-to-one session
    Booking(BookingId),
    /// A seat in a workshop
    Enrollment(EnrollmentId),
    /// A paid referral request
    Referral(ReferralRequestId),
}

impl OrderTarget {
    /// Stable name of the variant, used in logs and storage.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Booking(_) => "booking",
            Self::Enrollment(_) => "enrollment",
            Self::Referral(_) => "referral",
        }
    }

    /// The target's UUID regardless of variant.
    #[must_use]
    pub const fn uuid(&self) -> &Uuid {
        match self {
            Self::Booking(id) => id.as_uuid(),
            Self::Enrollment(id) => id.as_uuid(),
            Self::Referral(id) => id.as_uuid(),
        }
    }
}

impl fmt::Display for OrderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.uuid())
    }
}

/// A payment order created with the gateway before the core runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    /// Order ID
    pub id: OrderId,
    /// Gateway order identifier (e.g. `order_Kx9…`)
    pub external_order_id: String,
    /// Current status
    pub status: OrderStatus,
    /// Gateway payment identifier, once a payment attempt is known
    pub external_payment_id: Option<String>,
    /// What the order pays for
    pub target: OrderTarget,
    /// When the order was recorded
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl PaymentOrder {
    /// A fresh pending order.
    #[must_use]
    pub fn pending(external_order_id: impl Into<String>, target: OrderTarget, now: DateTime<Utc>) -> Self {
        Self {
            id: OrderId::new(),
            external_order_id: external_order_id.into(),
            status: OrderStatus::Pending,
            external_payment_id: None,
            target,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A student's seat in a workshop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopEnrollment {
    /// Enrollment ID
    pub id: EnrollmentId,
    /// Workshop enrolled in
    pub workshop_id: WorkshopId,
    /// Enrolled student
    pub student_id: StudentId,
    /// Meeting invite address
    pub student_email: String,
    /// Whether the seat has been paid for
    pub payment_status: bool,
}

/// A paid request for a mentor referral.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralRequest {
    /// Request ID
    pub id: ReferralRequestId,
    /// Mentor asked for the referral
    pub mentor_id: MentorId,
    /// Requesting student
    pub student_id: StudentId,
    /// Whether the request has been paid for
    pub payment_status: bool,
}

// ============================================================================
// Workshops
// ============================================================================

/// When a workshop day happens: every given weekday, or on a fixed date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleDay {
    /// Recurring weekday
    Weekday(Weekday),
    /// Specific calendar date
    Date(NaiveDate),
}

/// One entry of a workshop's schedule cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Day of the entry
    pub day: ScheduleDay,
    /// Local start time
    pub time: TimeOfDay,
}

/// A provisioned meeting link for one workshop day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetLink {
    /// Joinable URL
    pub link: String,
    /// Session start the link was created for
    pub scheduled_for: DateTime<Utc>,
    /// When the link was provisioned
    pub generated_at: DateTime<Utc>,
}

/// A multi-day workshop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workshop {
    /// Workshop ID
    pub id: WorkshopId,
    /// Hosting mentor
    pub mentor_id: MentorId,
    /// Meeting title
    pub title: String,
    /// Total number of sessions
    pub number_of_days: u32,
    /// Length of each session
    pub session_minutes: u32,
    /// Schedule cycle; day `i` uses entry `i % len`
    pub schedule: Vec<ScheduleEntry>,
    /// Links keyed by [`day_key`]
    #[serde(default)]
    pub meet_links: BTreeMap<String, MeetLink>,
    /// Inactive workshops are never scanned
    pub active: bool,
    /// First date weekday entries may fall on, when known
    #[serde(default)]
    pub starts_on: Option<NaiveDate>,
}

/// Link map key for a 1-based workshop day number.
#[must_use]
pub fn day_key(day_number: u32) -> String {
    format!("day{day_number}")
}
