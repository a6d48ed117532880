//! # MentorLink Core
//!
//! Domain types and pure logic for the MentorLink mentorship marketplace.
//!
//! This crate has no I/O. It holds:
//!
//! - **Time**: [`TimeOfDay`], the one parse/format routine for "hh:mm AM/PM"
//! - **Model**: bookings, payment orders and their targets, workshops
//! - **Slots**: [`availability::resolve_slots`] and [`conflict::conflicts`]
//! - **Schedules**: [`schedule::due_occurrences`] for workshop days
//! - **Payments**: [`webhook::PaymentEvent`] and [`webhook::plan_transition`]
//! - **Ports**: the collaborator traits the runtime is wired with
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Decisions are pure functions; the shell applies them
//! - Dependency Injection via trait objects
//!
//! ## Example
//!
//! ```
//! use chrono::{NaiveDate, Weekday};
//! use mentorlink_core::availability::resolve_slots;
//! use mentorlink_core::types::{Availability, MentorId, TimeRange};
//!
//! let availability = Availability::new(MentorId::new())
//!     .with_day(Weekday::Mon, TimeRange::new(9 * 60, 10 * 60).into_iter().collect());
//! let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap_or_default();
//! let slots: Vec<String> = resolve_slots(&availability, monday, 30)
//!     .iter()
//!     .map(ToString::to_string)
//!     .collect();
//! assert_eq!(slots, ["09:00 AM", "09:30 AM"]);
//! ```

pub mod availability;
pub mod conflict;
pub mod environment;
pub mod error;
pub mod ports;
pub mod schedule;
pub mod time_of_day;
pub mod types;
pub mod webhook;

pub use environment::{Clock, SystemClock};
pub use error::{MarketplaceError, RemoteServiceError, Result, StoreError};
pub use time_of_day::{TimeOfDay, TimeParseError};
