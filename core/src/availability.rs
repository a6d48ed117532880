//! Slot computation from a mentor's weekly availability.
//!
//! Pure functions; nothing here touches storage or the clock.

use chrono::{Datelike, NaiveDate};

use crate::conflict::{self, Candidate};
use crate::time_of_day::TimeOfDay;
use crate::types::{Availability, Booking, DayAvailability};

/// The enabled configuration for `date`'s weekday, if it has any windows.
#[must_use]
pub fn enabled_day(availability: &Availability, date: NaiveDate) -> Option<&DayAvailability> {
    availability
        .day(date.weekday())
        .filter(|day| day.enabled && !day.ranges.is_empty())
}

/// Candidate start times for a session of `duration_minutes` on `date`.
///
/// Each window is walked on its own, stepping by `duration + buffer` while the
/// session still ends inside the window. Windows are not merged, so
/// overlapping windows can yield duplicate or interleaved starts.
#[must_use]
pub fn resolve_slots(availability: &Availability, date: NaiveDate, duration_minutes: u32) -> Vec<TimeOfDay> {
    if duration_minutes == 0 {
        return Vec::new();
    }
    let Some(day) = enabled_day(availability, date) else {
        return Vec::new();
    };

    let step = duration_minutes + availability.buffer_minutes;
    let mut slots = Vec::new();
    for range in &day.ranges {
        let end = u32::from(range.end);
        let mut start = u32::from(range.start);
        while start + duration_minutes <= end {
            if let Some(slot) = u16::try_from(start).ok().and_then(TimeOfDay::from_minutes) {
                slots.push(slot);
            }
            start += step;
        }
    }
    slots
}

/// Resolved slots that do not clash with any of `existing`.
#[must_use]
pub fn open_slots(
    availability: &Availability,
    date: NaiveDate,
    duration_minutes: u32,
    existing: &[Booking],
) -> Vec<TimeOfDay> {
    resolve_slots(availability, date, duration_minutes)
        .into_iter()
        .filter(|&time| {
            !conflict::conflicts(
                &Candidate {
                    date,
                    time,
                    duration_minutes,
                },
                existing,
            )
        })
        .collect()
}

/// Whether a requested session lies wholly inside one enabled window.
#[must_use]
pub fn fits_availability(availability: &Availability, date: NaiveDate, time: TimeOfDay, duration_minutes: u32) -> bool {
    enabled_day(availability, date)
        .is_some_and(|day| day.ranges.iter().any(|range| range.contains_slot(time, duration_minutes)))
}
