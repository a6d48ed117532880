//! # MentorLink Testing
//!
//! Test doubles and helpers for MentorLink components.
//!
//! This crate provides:
//! - Deterministic clocks
//! - [`InMemoryMarketplace`], implementing every store port
//! - [`ScriptedProvisioner`] and [`RecordingNotifier`] for the remote collaborators
//! - Fixtures and a [`TestMarketplace`] harness that wires them together
//!
//! ## Example
//!
//! ```
//! use mentorlink_testing::TestMarketplace;
//!
//! let market = TestMarketplace::new();
//! let mentor_id = market.mentor();
//! assert!(market.store.bookings().is_empty());
//! # let _ = mentor_id;
//! ```

// Test support: a failed lock or fixture parse is a failed test.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, Utc};
use mentorlink_core::Clock;

pub mod fixtures;
pub mod meet;
pub mod notifier;
pub mod store;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::TimeDelta;
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use mentorlink_testing::mocks::FixedClock;
    /// use mentorlink_core::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that moves only when told to.
    ///
    /// Clones share the same time, so a test can keep one handle and give
    /// another to the environment.
    #[derive(Debug, Clone)]
    pub struct MockClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl MockClock {
        /// Start at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move forward by `delta`.
        ///
        /// # Panics
        ///
        /// If a previous user of the clock panicked while holding it.
        #[allow(clippy::unwrap_used)]
        pub fn advance(&self, delta: TimeDelta) {
            let mut time = self.time.lock().unwrap();
            *time += delta;
        }

        /// Jump to `time`.
        ///
        /// # Panics
        ///
        /// If a previous user of the clock panicked while holding it.
        #[allow(clippy::unwrap_used)]
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap() = time;
        }
    }

    impl Clock for MockClock {
        #[allow(clippy::unwrap_used)]
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Install a test subscriber that prints `tracing` output for failing tests.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use fixtures::TestMarketplace;
pub use meet::ScriptedProvisioner;
pub use mocks::{FixedClock, MockClock, test_clock};
pub use notifier::RecordingNotifier;
pub use store::InMemoryMarketplace;
