//! Meeting provisioning for one-to-one bookings.
//!
//! Shared by the webhook processor (captured payments), the coordinator (free
//! sessions) and the recovery sweep. Only the caller holding a booking's
//! provisioning lease talks to the provider; everyone else backs off. The URL
//! itself is persisted with a guarded write, so a lease that expired mid-call
//! still ends with one stored URL.

use chrono::{FixedOffset, Offset, TimeDelta, Utc};
use mentorlink_core::ports::{MeetingProvisioner, MeetingRequest, Notification, ProvisionedMeeting};
use mentorlink_core::time_of_day::local_to_utc;
use mentorlink_core::types::Booking;
use mentorlink_core::{MarketplaceError, RemoteServiceError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::MarketplaceEnvironment;
use crate::metrics::ProvisionMetrics;
use crate::retry::{RetryPolicy, retry_remote, with_timeout};

/// Service name used in remote errors from the meeting provider.
pub const MEET_SERVICE: &str = "meet";

/// How meeting calls are made.
#[derive(Debug, Clone)]
pub struct MeetingSettings {
    /// Deadline for a single provider call
    pub call_timeout: Duration,
    /// Backoff across calls
    pub retry: RetryPolicy,
    /// Offset booking dates and times are expressed in
    pub utc_offset: FixedOffset,
    /// Title given to one-to-one sessions
    pub session_title: String,
}

impl MeetingSettings {
    /// How long a provisioning lease is honoured: every attempt timing out
    /// and every backoff at its cap, plus a minute.
    #[must_use]
    pub fn provisioning_lease(&self) -> Duration {
        let attempts = self.retry.max_attempts.max(1);
        self.call_timeout
            .saturating_mul(attempts)
            .saturating_add(self.retry.max_delay.saturating_mul(attempts - 1))
            .saturating_add(Duration::from_secs(60))
    }
}

impl Default for MeetingSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            utc_offset: Utc.fix(),
            session_title: "Mentorship session".to_string(),
        }
    }
}

/// Create one meeting with a per-call timeout and backoff between calls.
///
/// # Errors
///
/// The provider's last error once retries are exhausted, or its first
/// permanent one.
pub async fn create_meeting_with_retry(
    provisioner: &dyn MeetingProvisioner,
    request: &MeetingRequest,
    call_timeout: Duration,
    policy: &RetryPolicy,
) -> Result<ProvisionedMeeting, RemoteServiceError> {
    let started = Instant::now();
    let result = retry_remote(policy, || {
        with_timeout(MEET_SERVICE, call_timeout, provisioner.create_meeting(request.clone()))
    })
    .await;

    match &result {
        Ok(meeting) if meeting.join_url.trim().is_empty() => {
            ProvisionMetrics::record("failed", started.elapsed());
            return Err(RemoteServiceError::permanent(MEET_SERVICE, "provider returned an empty join url"));
        }
        Ok(_) => ProvisionMetrics::record("created", started.elapsed()),
        Err(_) => ProvisionMetrics::record("failed", started.elapsed()),
    }
    result
}

/// What [`BookingMeetings::ensure_meeting`] left on the booking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeetingOutcome {
    /// This call created and stored the URL
    Created(String),
    /// A URL was already stored (before or during this call)
    AlreadyPresent(String),
    /// Another caller holds the provisioning lease; nothing requested
    InProgress,
    /// The booking lost its payment while the call was in flight; nothing stored
    Released,
}

impl MeetingOutcome {
    /// The stored URL, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Created(url) | Self::AlreadyPresent(url) => Some(url),
            Self::InProgress | Self::Released => None,
        }
    }
}

/// Provisions and stores meetings for bookings.
#[derive(Clone)]
pub struct BookingMeetings {
    env: MarketplaceEnvironment,
    settings: Arc<MeetingSettings>,
}

impl BookingMeetings {
    /// Create the service.
    #[must_use]
    pub fn new(env: MarketplaceEnvironment, settings: MeetingSettings) -> Self {
        Self {
            env,
            settings: Arc::new(settings),
        }
    }

    /// Settings in use.
    #[must_use]
    pub fn settings(&self) -> &MeetingSettings {
        &self.settings
    }

    /// Make sure `booking` has a stored meeting URL.
    ///
    /// # Errors
    ///
    /// [`MarketplaceError::RemoteService`] when the provider fails; the lease
    /// is dropped and the booking is left without a URL for the recovery
    /// sweep. [`MarketplaceError::Persistence`] when the lease or the guarded
    /// write fails.
    pub async fn ensure_meeting(&self, booking: &Booking) -> Result<MeetingOutcome, MarketplaceError> {
        if let Some(url) = booking.meet_url.as_deref().filter(|url| !url.trim().is_empty()) {
            return Ok(MeetingOutcome::AlreadyPresent(url.to_string()));
        }

        let lease = TimeDelta::from_std(self.settings.provisioning_lease()).unwrap_or(TimeDelta::MAX);
        let claimed = self
            .env
            .bookings
            .claim_provisioning(booking.id, self.env.clock.now(), lease)
            .await?;
        if !claimed {
            return self.settled_elsewhere(booking).await;
        }

        let mut attendees = vec![booking.contact.email.clone()];
        match self.env.mentors.mentor_email(booking.mentor_id).await {
            Ok(Some(email)) => attendees.push(email),
            Ok(None) => tracing::warn!(mentor_id = %booking.mentor_id, "Mentor has no email, inviting student only"),
            Err(e) => tracing::warn!(mentor_id = %booking.mentor_id, error = %e, "Mentor email lookup failed"),
        }

        let request = MeetingRequest {
            title: self.settings.session_title.clone(),
            start: local_to_utc(booking.start(), self.settings.utc_offset),
            duration_minutes: booking.duration_minutes,
            attendees,
        };

        let meeting = match create_meeting_with_retry(
            self.env.provisioner.as_ref(),
            &request,
            self.settings.call_timeout,
            &self.settings.retry,
        )
        .await
        {
            Ok(meeting) => meeting,
            Err(e) => {
                tracing::error!(booking_id = %booking.id, error = %e, "Meeting provisioning failed");
                if let Err(release) = self.env.bookings.release_provisioning(booking.id).await {
                    tracing::warn!(booking_id = %booking.id, error = %release, "Provisioning lease not released");
                }
                return Err(e.into());
            }
        };

        let written = self
            .env
            .bookings
            .set_meet_url_if_empty(booking.id, meeting.join_url.clone())
            .await?;

        if written {
            tracing::info!(booking_id = %booking.id, "Meeting link stored");
            let notification = Notification::MeetingReady {
                booking_id: booking.id,
                meet_url: meeting.join_url.clone(),
            };
            if let Err(e) = self.env.notifier.notify(notification).await {
                tracing::warn!(booking_id = %booking.id, error = %e, "Meeting notification failed");
            }
            return Ok(MeetingOutcome::Created(meeting.join_url));
        }

        let current = self
            .env
            .bookings
            .booking(booking.id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found("booking", booking.id))?;
        if let Some(stored) = current.meet_url {
            tracing::warn!(
                booking_id = %booking.id,
                discarded_meeting = ?meeting.meeting_id,
                "Concurrent provisioning stored a link first, discarding ours"
            );
            return Ok(MeetingOutcome::AlreadyPresent(stored));
        }
        tracing::warn!(
            booking_id = %booking.id,
            discarded_meeting = ?meeting.meeting_id,
            "Booking is no longer paid, discarding meeting"
        );
        Ok(MeetingOutcome::Released)
    }

    /// Outcome for a caller that did not get the lease.
    async fn settled_elsewhere(&self, booking: &Booking) -> Result<MeetingOutcome, MarketplaceError> {
        let current = self
            .env
            .bookings
            .booking(booking.id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found("booking", booking.id))?;
        if let Some(url) = current.meet_url.filter(|url| !url.trim().is_empty()) {
            return Ok(MeetingOutcome::AlreadyPresent(url));
        }
        if !(current.payment_status || current.is_free_session) {
            return Ok(MeetingOutcome::Released);
        }
        tracing::info!(booking_id = %booking.id, "Meeting is being provisioned by another caller");
        Ok(MeetingOutcome::InProgress)
    }
}
