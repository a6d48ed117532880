//! Periodic triggers for background jobs.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Run `tick` every `interval` until `shutdown` turns `true` or its sender
/// is dropped.
///
/// The first tick fires immediately. A run in progress is never cancelled;
/// shutdown is observed between runs, and ticks missed during a long run are
/// skipped rather than bunched up.
pub fn spawn_periodic<F, Fut>(
    job: &'static str,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(job, interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX), "Periodic job started");

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!(job, "Periodic job stopped");
    })
}
