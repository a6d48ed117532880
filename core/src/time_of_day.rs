//! Wall-clock time of day in the marketplace's `hh:mm AM/PM` label format.
//!
//! Every component that reads or renders a slot time goes through [`TimeOfDay`],
//! so the 12-hour rules live in exactly one place:
//!
//! - `12:xx AM` is hour 0
//! - `12:xx PM` is hour 12
//! - any other PM hour gains 12
//!
//! # Example
//!
//! ```
//! use mentorlink_core::time_of_day::TimeOfDay;
//!
//! let t: TimeOfDay = "02:30 PM".parse().unwrap();
//! assert_eq!(t.minutes(), 14 * 60 + 30);
//! assert_eq!(t.to_string(), "02:30 PM");
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of minutes in a day.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Errors produced while parsing a time label.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    /// The label was empty or whitespace.
    #[error("time label is empty")]
    Empty,

    /// The label did not end in `AM` or `PM`.
    #[error("missing AM/PM suffix in {0:?}")]
    MissingMeridiem(String),

    /// The label was not of the form `hh:mm`.
    #[error("malformed time label {0:?}")]
    Malformed(String),

    /// Hour outside `1..=12`.
    #[error("hour out of range in {0:?}")]
    HourOutOfRange(String),

    /// Minute outside `0..=59`.
    #[error("minute out of range in {0:?}")]
    MinuteOutOfRange(String),
}

/// A time of day with minute precision, stored as minutes since midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// 12:00 AM.
    pub const MIDNIGHT: Self = Self(0);

    /// Build from minutes since midnight. `None` when `minutes >= 1440`.
    #[must_use]
    pub const fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes < MINUTES_PER_DAY {
            Some(Self(minutes))
        } else {
            None
        }
    }

    /// Build from a 24-hour clock reading.
    #[must_use]
    pub const fn from_hm(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour as u16 * 60 + minute as u16))
        } else {
            None
        }
    }

    /// Parse an `hh:mm AM/PM` label.
    ///
    /// The hour may be one or two digits, the space before the meridiem is
    /// optional and the meridiem is case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns a [`TimeParseError`] describing the first problem found.
    pub fn parse(label: &str) -> Result<Self, TimeParseError> {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(TimeParseError::Empty);
        }

        let malformed = || TimeParseError::Malformed(label.to_string());

        let split = trimmed.len().checked_sub(2).ok_or_else(malformed)?;
        if !trimmed.is_char_boundary(split) {
            return Err(malformed());
        }
        let (clock, meridiem) = trimmed.split_at(split);
        let pm = if meridiem.eq_ignore_ascii_case("AM") {
            false
        } else if meridiem.eq_ignore_ascii_case("PM") {
            true
        } else {
            return Err(TimeParseError::MissingMeridiem(label.to_string()));
        };

        let clock = clock.strip_suffix(' ').unwrap_or(clock);
        let (hour_text, minute_text) = clock.split_once(':').ok_or_else(malformed)?;
        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !digits(hour_text) || hour_text.len() > 2 || !digits(minute_text) || minute_text.len() != 2 {
            return Err(malformed());
        }

        let hour: u8 = hour_text.parse().map_err(|_| malformed())?;
        let minute: u8 = minute_text.parse().map_err(|_| malformed())?;
        if !(1..=12).contains(&hour) {
            return Err(TimeParseError::HourOutOfRange(label.to_string()));
        }
        if minute > 59 {
            return Err(TimeParseError::MinuteOutOfRange(label.to_string()));
        }

        let hour24 = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };

        Ok(Self(u16::from(hour24) * 60 + u16::from(minute)))
    }

    /// Minutes since midnight.
    #[must_use]
    pub const fn minutes(self) -> u16 {
        self.0
    }

    /// Hour on the 24-hour clock.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // < 24
    pub const fn hour(self) -> u8 {
        (self.0 / 60) as u8
    }

    /// Minute within the hour.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // < 60
    pub const fn minute(self) -> u8 {
        (self.0 % 60) as u8
    }

    /// Add minutes without wrapping past midnight.
    #[must_use]
    pub fn checked_add_minutes(self, minutes: u32) -> Option<Self> {
        let total = u32::from(self.0).checked_add(minutes)?;
        u16::try_from(total).ok().and_then(Self::from_minutes)
    }

    /// Convert to a `chrono` time.
    #[must_use]
    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_num_seconds_from_midnight_opt(u32::from(self.0) * 60, 0).unwrap_or_default()
    }

    /// This time on the given date.
    #[must_use]
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.to_naive_time())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hour = self.hour();
        let meridiem = if hour < 12 { "AM" } else { "PM" };
        let hour12 = match hour {
            0 => 12,
            1..=12 => hour,
            _ => hour - 12,
        };
        write!(f, "{hour12:02}:{:02} {meridiem}", self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::parse(&label).map_err(serde::de::Error::custom)
    }
}

/// Interpret a local wall-clock reading at a fixed UTC offset.
#[must_use]
pub fn local_to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    let utc = local - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc)
}

/// Express a UTC instant as a local wall-clock reading at a fixed offset.
#[must_use]
pub fn utc_to_local(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDateTime {
    instant.with_timezone(&offset).naive_local()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn t(label: &str) -> TimeOfDay {
        TimeOfDay::parse(label).unwrap()
    }

    #[test]
    fn test_twelve_am_is_midnight() {
        assert_eq!(t("12:00 AM"), TimeOfDay::MIDNIGHT);
        assert_eq!(t("12:45 AM").minutes(), 45);
    }

    #[test]
    fn test_twelve_pm_is_noon() {
        assert_eq!(t("12:00 PM").minutes(), 12 * 60);
        assert_eq!(t("12:30 PM").hour(), 12);
    }

    #[test]
    fn test_pm_hours_gain_twelve() {
        assert_eq!(t("01:15 PM").minutes(), 13 * 60 + 15);
        assert_eq!(t("11:59 PM").minutes(), 23 * 60 + 59);
        assert_eq!(t("09:00 AM").minutes(), 9 * 60);
    }

    #[test]
    fn test_lenient_forms() {
        assert_eq!(t("9:05am"), t("09:05 AM"));
        assert_eq!(t("  3:00 pm "), t("03:00 PM"));
    }

    #[test]
    fn test_rejects_bad_labels() {
        assert_eq!(TimeOfDay::parse(""), Err(TimeParseError::Empty));
        assert!(matches!(TimeOfDay::parse("09:00"), Err(TimeParseError::MissingMeridiem(_))));
        assert!(matches!(TimeOfDay::parse("0900 AM"), Err(TimeParseError::Malformed(_))));
        assert!(matches!(TimeOfDay::parse("13:00 PM"), Err(TimeParseError::HourOutOfRange(_))));
        assert!(matches!(TimeOfDay::parse("00:30 AM"), Err(TimeParseError::HourOutOfRange(_))));
        assert!(matches!(TimeOfDay::parse("10:60 AM"), Err(TimeParseError::MinuteOutOfRange(_))));
        assert!(matches!(TimeOfDay::parse("10:5 AM"), Err(TimeParseError::Malformed(_))));
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(TimeOfDay::MIDNIGHT.to_string(), "12:00 AM");
        assert_eq!(TimeOfDay::from_hm(12, 0).unwrap().to_string(), "12:00 PM");
        assert_eq!(TimeOfDay::from_hm(9, 30).unwrap().to_string(), "09:30 AM");
        assert_eq!(TimeOfDay::from_hm(21, 5).unwrap().to_string(), "09:05 PM");
    }

    #[test]
    fn test_checked_add_stops_at_midnight() {
        let late = TimeOfDay::from_hm(23, 30).unwrap();
        assert_eq!(late.checked_add_minutes(29).unwrap().minutes(), 23 * 60 + 59);
        assert!(late.checked_add_minutes(30).is_none());
    }

    #[test]
    fn test_serde_uses_label() {
        let json = serde_json::to_string(&t("04:00 PM")).unwrap();
        assert_eq!(json, "\"04:00 PM\"");
        let back: TimeOfDay = serde_json::from_str("\"4:00 pm\"").unwrap();
        assert_eq!(back.minutes(), 16 * 60);
        assert!(serde_json::from_str::<TimeOfDay>("\"16:00\"").is_err());
    }

    #[test]
    fn test_local_to_utc_applies_offset() {
        let offset = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let local = t("10:00 AM").on(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        let utc = local_to_utc(local, offset);
        assert_eq!(utc.to_rfc3339(), "2025-03-03T04:30:00+00:00");
        assert_eq!(utc_to_local(utc, offset), local);
    }
}
