//! Booking conflict detection.
//!
//! Intervals are half-open, `[start, start + duration)`, so a session ending
//! exactly when another starts does not clash with it. Every booking is
//! measured with its own duration.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::time_of_day::TimeOfDay;
use crate::types::Booking;

/// A slot someone wants to book.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Requested date
    pub date: NaiveDate,
    /// Requested start
    pub time: TimeOfDay,
    /// Requested length
    pub duration_minutes: u32,
}

impl Candidate {
    /// Absolute local start.
    #[must_use]
    pub fn start(&self) -> NaiveDateTime {
        self.time.on(self.date)
    }

    /// Absolute local end.
    #[must_use]
    pub fn end(&self) -> NaiveDateTime {
        self.start() + TimeDelta::minutes(i64::from(self.duration_minutes))
    }
}

/// Half-open interval intersection.
#[must_use]
pub fn overlaps(a_start: NaiveDateTime, a_end: NaiveDateTime, b_start: NaiveDateTime, b_end: NaiveDateTime) -> bool {
    a_start < b_end && a_end > b_start
}

/// The first existing booking the candidate clashes with.
///
/// `existing` should already be limited to the candidate's mentor; callers
/// with large calendars should also pre-filter by date.
#[must_use]
pub fn first_conflict<'a>(candidate: &Candidate, existing: &'a [Booking]) -> Option<&'a Booking> {
    let (start, end) = (candidate.start(), candidate.end());
    existing
        .iter()
        .find(|booking| overlaps(start, end, booking.start(), booking.end()))
}

/// Whether the candidate clashes with any existing booking.
#[must_use]
pub fn conflicts(candidate: &Candidate, existing: &[Booking]) -> bool {
    first_conflict(candidate, existing).is_some()
}
