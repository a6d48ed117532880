//! Notifier that remembers what it was asked to send.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity

use mentorlink_core::ports::{Notification, Notifier, RemoteFuture};
use std::sync::{Arc, Mutex};

/// Records every notification.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) -> RemoteFuture<'_, ()> {
        self.sent.lock().unwrap().push(notification);
        Box::pin(async { Ok(()) })
    }
}
