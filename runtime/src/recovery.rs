//! Booking link recovery sweep.
//!
//! Payment capture and meeting provisioning fail independently. When the
//! provider was down at capture time the booking stays paid with no URL;
//! this sweep finds such bookings and provisions them through the same
//! guarded write the webhook path uses.

use mentorlink_core::MarketplaceError;
use mentorlink_core::time_of_day::utc_to_local;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::MarketplaceEnvironment;
use crate::metrics::RecoveryMetrics;
use crate::periodic::spawn_periodic;
use crate::provisioning::{BookingMeetings, MeetingOutcome};

/// Job name used in logs.
pub const JOB_NAME: &str = "booking_link_recovery";

/// Counters for one sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Bookings looked at
    pub scanned: u64,
    /// Links stored by this sweep
    pub created: u64,
    /// Bookings that gained a link elsewhere or lost their payment meanwhile
    pub unchanged: u64,
    /// Bookings still without a link
    pub failed: u64,
}

/// Re-provisions paid bookings that have no meeting.
#[derive(Clone)]
pub struct BookingLinkRecovery {
    env: MarketplaceEnvironment,
    meetings: BookingMeetings,
    batch_size: u32,
}

impl BookingLinkRecovery {
    /// Create the sweep.
    #[must_use]
    pub const fn new(env: MarketplaceEnvironment, meetings: BookingMeetings, batch_size: u32) -> Self {
        Self {
            env,
            meetings,
            batch_size,
        }
    }

    /// One sweep over at most `batch_size` bookings from today onward.
    ///
    /// # Errors
    ///
    /// [`MarketplaceError::Persistence`] if the candidates cannot be loaded.
    pub async fn run_once(&self) -> Result<RecoveryStats, MarketplaceError> {
        let today = utc_to_local(self.env.clock.now(), self.meetings.settings().utc_offset).date();
        let pending = self
            .env
            .bookings
            .bookings_missing_meet_url(today, self.batch_size.max(1))
            .await?;

        let mut stats = RecoveryStats::default();
        for booking in pending {
            stats.scanned += 1;
            match self.meetings.ensure_meeting(&booking).await {
                Ok(MeetingOutcome::Created(_)) => stats.created += 1,
                Ok(_) => stats.unchanged += 1,
                Err(e) => {
                    tracing::warn!(booking_id = %booking.id, error = %e, "Booking link recovery failed");
                    stats.failed += 1;
                }
            }
        }

        if stats.scanned > 0 {
            tracing::info!(
                job = JOB_NAME,
                scanned = stats.scanned,
                created = stats.created,
                unchanged = stats.unchanged,
                failed = stats.failed,
                "Booking link recovery finished"
            );
        }
        RecoveryMetrics::record(stats.created, stats.failed);
        Ok(stats)
    }

    /// Tick [`run_once`](Self::run_once) every `interval` until shutdown.
    #[must_use]
    pub fn spawn(self, interval: Duration, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        spawn_periodic(JOB_NAME, interval, shutdown, move || {
            let sweep = self.clone();
            async move {
                if let Err(e) = sweep.run_once().await {
                    tracing::error!(job = JOB_NAME, error = %e, "Booking link recovery failed to start");
                }
            }
        })
    }
}
