//! Workshop meeting link batch job.
//!
//! Each run provisions links for workshop sessions starting inside the
//! lookahead window that do not have one yet. Runs are debounced through a
//! persisted marker so several instances ticking together still produce one
//! run per cooldown.
//!
//! Workshops are paged by id. Within a page they are processed concurrently
//! (bounded); within a workshop the provider is called one day at a time with
//! a fixed pause between calls. A failure in one workshop is counted and the
//! run moves on.

use chrono::{FixedOffset, Offset, TimeDelta, Utc};
use futures::stream::{self, StreamExt};
use mentorlink_core::MarketplaceError;
use mentorlink_core::ports::MeetingRequest;
use mentorlink_core::schedule::{LookaheadWindow, due_occurrences, schedule_anchor};
use mentorlink_core::types::{MeetLink, Workshop, WorkshopId};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::MarketplaceEnvironment;
use crate::metrics::WorkshopJobMetrics;
use crate::periodic::spawn_periodic;
use crate::provisioning::create_meeting_with_retry;
use crate::retry::RetryPolicy;

/// Name of the job's debounce marker.
pub const JOB_NAME: &str = "workshop_links";

/// Workshop link job configuration.
#[derive(Debug, Clone)]
pub struct WorkshopLinkJobConfig {
    /// Workshops loaded per page
    pub batch_size: u32,
    /// Minimum gap between run starts, across instances
    pub cooldown: Duration,
    /// Sessions starting sooner than this are left alone
    pub min_lead: Duration,
    /// Sessions starting later than this are not due yet
    pub lookahead: Duration,
    /// Pause between provider calls for one workshop
    pub inter_call_delay: Duration,
    /// Workshops of one page processed at the same time
    pub max_concurrent_workshops: usize,
    /// Deadline for a single provider call
    pub call_timeout: Duration,
    /// Backoff across calls
    pub retry: RetryPolicy,
    /// Offset workshop schedules are expressed in
    pub utc_offset: FixedOffset,
}

impl Default for WorkshopLinkJobConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            cooldown: Duration::from_secs(10 * 60),
            min_lead: Duration::from_secs(15 * 60),
            lookahead: Duration::from_secs(24 * 60 * 60),
            inter_call_delay: Duration::from_millis(500),
            max_concurrent_workshops: 4,
            call_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            utc_offset: Utc.fix(),
        }
    }
}

impl WorkshopLinkJobConfig {
    fn window(&self) -> LookaheadWindow {
        let delta = |d: Duration| TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX);
        LookaheadWindow {
            min_lead: delta(self.min_lead),
            lookahead: delta(self.lookahead),
        }
    }
}

/// Counters for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Pages loaded
    pub batches: u32,
    /// Workshops looked at
    pub workshops_scanned: u64,
    /// Links persisted by this run
    pub links_created: u64,
    /// Links dropped because the key was filled meanwhile
    pub links_skipped: u64,
    /// Failed workshops plus failed provider calls
    pub failures: u64,
}

impl RunStats {
    fn absorb(&mut self, report: &WorkshopReport) {
        self.workshops_scanned += 1;
        self.links_created += report.created;
        self.links_skipped += report.skipped;
        self.failures += report.failed_calls;
    }
}

/// Result of [`WorkshopLinkJob::run_once`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunReport {
    /// Another run started within the cooldown
    Skipped,
    /// The run went through every page
    Completed(RunStats),
}

#[derive(Debug, Default)]
struct WorkshopReport {
    created: u64,
    skipped: u64,
    failed_calls: u64,
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Provisions links for upcoming workshop sessions.
#[derive(Clone)]
pub struct WorkshopLinkJob {
    env: MarketplaceEnvironment,
    config: Arc<WorkshopLinkJobConfig>,
}

impl WorkshopLinkJob {
    /// Create the job.
    #[must_use]
    pub fn new(env: MarketplaceEnvironment, config: WorkshopLinkJobConfig) -> Self {
        Self {
            env,
            config: Arc::new(config),
        }
    }

    /// One pass over every active, paid workshop.
    ///
    /// # Errors
    ///
    /// [`MarketplaceError::Persistence`] when the marker cannot be taken or a
    /// page cannot be loaded. Per-workshop failures are counted in the stats
    /// instead.
    pub async fn run_once(&self) -> Result<RunReport, MarketplaceError> {
        let started = Instant::now();
        let now = self.env.clock.now();
        let cooldown = TimeDelta::from_std(self.config.cooldown).unwrap_or(TimeDelta::MAX);

        let acquired = self
            .env
            .job_runs
            .try_begin(JOB_NAME, now, cooldown)
            .await
            .inspect_err(|_| WorkshopJobMetrics::record_error())?;
        if !acquired {
            tracing::info!(job = JOB_NAME, "Previous run is within the cooldown, skipping");
            WorkshopJobMetrics::record_skipped();
            return Ok(RunReport::Skipped);
        }

        let mut stats = RunStats::default();
        let mut after: Option<WorkshopId> = None;
        let batch_size = self.config.batch_size.max(1);
        let concurrency = self.config.max_concurrent_workshops.max(1);

        loop {
            let page = self
                .env
                .workshops
                .active_paid_workshops(after, batch_size)
                .await
                .inspect_err(|_| WorkshopJobMetrics::record_error())?;
            let Some(last) = page.last() else {
                break;
            };
            after = Some(last.id);
            stats.batches += 1;
            let full_page = page.len() >= usize::try_from(batch_size).unwrap_or(usize::MAX);

            let reports: Vec<_> = stream::iter(page)
                .map(|workshop| {
                    let job = self.clone();
                    async move {
                        let id = workshop.id;
                        (id, job.process_workshop(workshop).await)
                    }
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

            for (workshop_id, report) in reports {
                match report {
                    Ok(report) => stats.absorb(&report),
                    Err(e) => {
                        tracing::warn!(workshop_id = %workshop_id, error = %e, "Workshop failed, continuing");
                        stats.workshops_scanned += 1;
                        stats.failures += 1;
                    }
                }
            }

            if !full_page {
                break;
            }
        }

        let elapsed = started.elapsed();
        tracing::info!(
            job = JOB_NAME,
            batches = stats.batches,
            workshops = stats.workshops_scanned,
            created = stats.links_created,
            skipped = stats.links_skipped,
            failures = stats.failures,
            duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Workshop link run finished"
        );
        WorkshopJobMetrics::record_completed(stats.links_created, stats.links_skipped, stats.failures, elapsed);
        Ok(RunReport::Completed(stats))
    }

    async fn process_workshop(&self, mut workshop: Workshop) -> Result<WorkshopReport, MarketplaceError> {
        let now = self.env.clock.now();
        let offset = self.config.utc_offset;
        let mut due = due_occurrences(&workshop, now, offset, self.config.window());
        if due.is_empty() {
            return Ok(WorkshopReport::default());
        }

        // First session coming due: pin the weekday cycles before any link
        // is keyed off them.
        if let Some(anchor) = schedule_anchor(&workshop, now, offset) {
            let starts_on = self.env.workshops.anchor_schedule(workshop.id, anchor).await?;
            tracing::info!(workshop_id = %workshop.id, starts_on = %starts_on, "Weekday schedule anchored");
            workshop.starts_on = Some(starts_on);
            due = due_occurrences(&workshop, now, offset, self.config.window());
            if due.is_empty() {
                return Ok(WorkshopReport::default());
            }
        }

        let mut attendees = Vec::new();
        if let Some(email) = self.env.mentors.mentor_email(workshop.mentor_id).await? {
            attendees.push(email);
        }
        attendees.extend(self.env.workshops.attendee_emails(workshop.id).await?);
        attendees.sort();
        attendees.dedup();

        let mut report = WorkshopReport::default();
        let mut links = BTreeMap::new();
        for (index, occurrence) in due.into_iter().enumerate() {
            if index > 0 && !self.config.inter_call_delay.is_zero() {
                tokio::time::sleep(self.config.inter_call_delay).await;
            }

            let request = MeetingRequest {
                title: format!("{} - Day {}", workshop.title, occurrence.day_number),
                start: occurrence.starts_at,
                duration_minutes: workshop.session_minutes,
                attendees: attendees.clone(),
            };
            match create_meeting_with_retry(
                self.env.provisioner.as_ref(),
                &request,
                self.config.call_timeout,
                &self.config.retry,
            )
            .await
            {
                Ok(meeting) => {
                    links.insert(
                        occurrence.key,
                        MeetLink {
                            link: meeting.join_url,
                            scheduled_for: occurrence.starts_at,
                            generated_at: self.env.clock.now(),
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        workshop_id = %workshop.id,
                        day = occurrence.day_number,
                        error = %e,
                        "Workshop link provisioning failed"
                    );
                    report.failed_calls += 1;
                }
            }
        }

        if links.is_empty() {
            return Ok(report);
        }

        let merged = self.env.workshops.merge_meet_links(workshop.id, links).await?;
        if !merged.skipped.is_empty() {
            tracing::info!(
                workshop_id = %workshop.id,
                keys = ?merged.skipped,
                "Links already stored by another run, kept theirs"
            );
        }
        report.created = count(merged.written.len());
        report.skipped = count(merged.skipped.len());
        Ok(report)
    }

    /// Tick [`run_once`](Self::run_once) every `interval` until shutdown.
    #[must_use]
    pub fn spawn(self, interval: Duration, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        spawn_periodic(JOB_NAME, interval, shutdown, move || {
            let job = self.clone();
            async move {
                if let Err(e) = job.run_once().await {
                    tracing::error!(job = JOB_NAME, error = %e, "Workshop link run failed");
                }
            }
        })
    }
}
