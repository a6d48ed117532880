//! Workshop day occurrences.
//!
//! A workshop's schedule is a cycle of entries. Day `i` (0-based) uses entry
//! `i % len` and is pushed `7 * (i / len)` days later, so a two-entry
//! Mon/Wed schedule over four days yields Mon, Wed, Mon+7, Wed+7.
//!
//! Weekday entries need an anchor to count cycles from. Until a workshop has
//! `starts_on`, they float to their next occurrence after `now`; the link job
//! stores [`schedule_anchor`] the first time a session comes due, which pins
//! every later cycle.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, Utc, Weekday};

use crate::time_of_day::{local_to_utc, utc_to_local};
use crate::types::{ScheduleDay, ScheduleEntry, Workshop, day_key};

/// One concrete session of a workshop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occurrence {
    /// 1-based day number
    pub day_number: u32,
    /// Link map key (`day{N}`)
    pub key: String,
    /// Absolute start
    pub starts_at: DateTime<Utc>,
}

/// How far ahead links are provisioned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookaheadWindow {
    /// Sessions starting sooner than this are left alone
    pub min_lead: TimeDelta,
    /// Sessions starting later than this are not due yet
    pub lookahead: TimeDelta,
}

impl LookaheadWindow {
    /// Whether `starts_at` falls inside `[now + min_lead, now + lookahead]`.
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>, starts_at: DateTime<Utc>) -> bool {
        starts_at >= now + self.min_lead && starts_at <= now + self.lookahead
    }
}

fn on_or_after(date: NaiveDate, weekday: Weekday) -> Option<NaiveDate> {
    let ahead = (7 + weekday.num_days_from_monday() - date.weekday().num_days_from_monday()) % 7;
    date.checked_add_days(Days::new(u64::from(ahead)))
}

/// Next start of `entry`'s weekday at its time, at or after `local_now`.
fn next_weekday(entry: ScheduleEntry, weekday: Weekday, local_now: NaiveDateTime) -> Option<NaiveDate> {
    let date = on_or_after(local_now.date(), weekday)?;
    if entry.time.on(date) < local_now {
        date.checked_add_days(Days::new(7))
    } else {
        Some(date)
    }
}

/// Every session of the workshop, in day order.
///
/// Weekday entries resolve to their next occurrence at or after `starts_on`
/// when the workshop has one, and otherwise at or after `now`. Local times
/// are read at `offset`.
#[must_use]
pub fn occurrences(workshop: &Workshop, now: DateTime<Utc>, offset: FixedOffset) -> Vec<Occurrence> {
    let len = u32::try_from(workshop.schedule.len()).unwrap_or(u32::MAX);
    if len == 0 {
        return Vec::new();
    }
    let local_now = utc_to_local(now, offset);

    (0..workshop.number_of_days)
        .filter_map(|index| {
            let entry = workshop.schedule[(index % len) as usize];
            let cycle = index / len;

            let base = match entry.day {
                ScheduleDay::Date(date) => date,
                ScheduleDay::Weekday(weekday) => match workshop.starts_on {
                    Some(anchor) => on_or_after(anchor, weekday)?,
                    None => next_weekday(entry, weekday, local_now)?,
                },
            };

            let date = base.checked_add_days(Days::new(7 * u64::from(cycle)))?;
            Some(Occurrence {
                day_number: index + 1,
                key: day_key(index + 1),
                starts_at: local_to_utc(entry.time.on(date), offset),
            })
        })
        .collect()
}

/// Anchor for a workshop whose weekday entries still float with `now`.
///
/// The earliest date the first cycle's weekday entries resolve to at `now`,
/// so anchoring keeps those sessions where they are. `None` when the
/// workshop is already anchored or has no weekday entries.
#[must_use]
pub fn schedule_anchor(workshop: &Workshop, now: DateTime<Utc>, offset: FixedOffset) -> Option<NaiveDate> {
    if workshop.starts_on.is_some() {
        return None;
    }
    let local_now = utc_to_local(now, offset);
    workshop
        .schedule
        .iter()
        .filter_map(|entry| match entry.day {
            ScheduleDay::Weekday(weekday) => next_weekday(*entry, weekday, local_now),
            ScheduleDay::Date(_) => None,
        })
        .min()
}

/// Sessions inside the window that do not have a stored link yet.
#[must_use]
pub fn due_occurrences(
    workshop: &Workshop,
    now: DateTime<Utc>,
    offset: FixedOffset,
    window: LookaheadWindow,
) -> Vec<Occurrence> {
    occurrences(workshop, now, offset)
        .into_iter()
        .filter(|occ| window.contains(now, occ.starts_at) && !workshop.meet_links.contains_key(&occ.key))
        .collect()
}
