//! Scripted meeting provider.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity

use mentorlink_core::RemoteServiceError;
use mentorlink_core::ports::{MeetingProvisioner, MeetingRequest, ProvisionedMeeting, RemoteFuture};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Meeting provider that replays queued responses.
///
/// Once the queue is empty every call succeeds with
/// `https://meet.test/<n>`. Every request is recorded, including failed ones.
#[derive(Clone, Debug, Default)]
pub struct ScriptedProvisioner {
    responses: Arc<Mutex<VecDeque<Result<ProvisionedMeeting, RemoteServiceError>>>>,
    requests: Arc<Mutex<Vec<MeetingRequest>>>,
    called_at: Arc<Mutex<Vec<Instant>>>,
    counter: Arc<AtomicU64>,
    delay: Option<Duration>,
}

impl ScriptedProvisioner {
    /// Provider that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful response with a fixed URL.
    pub fn push_url(&self, url: &str) {
        self.responses.lock().unwrap().push_back(Ok(ProvisionedMeeting {
            join_url: url.to_string(),
            meeting_id: None,
        }));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: RemoteServiceError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Queue `n` retryable failures.
    pub fn fail_times(&self, n: usize) {
        for _ in 0..n {
            self.push_error(RemoteServiceError::retryable("meet", "503 Service Unavailable"));
        }
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<MeetingRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// When each call arrived, on the tokio clock.
    #[must_use]
    pub fn call_instants(&self) -> Vec<Instant> {
        self.called_at.lock().unwrap().clone()
    }

    /// Number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl MeetingProvisioner for ScriptedProvisioner {
    fn create_meeting(&self, request: MeetingRequest) -> RemoteFuture<'_, ProvisionedMeeting> {
        self.requests.lock().unwrap().push(request);
        self.called_at.lock().unwrap().push(Instant::now());
        let scripted = self.responses.lock().unwrap().pop_front();
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            scripted.unwrap_or_else(|| {
                Ok(ProvisionedMeeting {
                    join_url: format!("https://meet.test/{n}"),
                    meeting_id: Some(format!("mtg-{n}")),
                })
            })
        })
    }
}
