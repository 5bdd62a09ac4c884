//! Cache Sweeper Task
//!
//! Background task that periodically asks an adapter to replay pending LRU
//! touches and remove expired entries.

use std::sync::Weak;
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

// == Maintain ==
/// Maintenance hook invoked by the sweeper.
#[async_trait]
pub trait Maintain: Send + Sync + 'static {
    /// Applies pending LRU touch events and deletes expired entries.
    async fn sync_event_and_clear_expired(&self);
}

/// Spawns a background task that runs the maintenance hook of `target`
/// every `interval`.
///
/// The hook runs inline in the task loop, so two sweeps never overlap; ticks
/// that fire while a sweep is still running are skipped rather than queued.
/// The task stops on its own once `target` has been dropped.
///
/// # Returns
/// A JoinHandle for the spawned task, or `None` when called outside a tokio
/// runtime or with a zero interval. Expired entries stay logically absent
/// without the sweeper, they are just not reclaimed.
pub fn spawn_sweeper<T: Maintain>(target: Weak<T>, interval: Duration) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        warn!("Sweep interval is zero, cache sweeper not started");
        return None;
    }
    let Ok(runtime) = Handle::try_current() else {
        warn!("No tokio runtime available, cache sweeper not started");
        return None;
    };

    Some(runtime.spawn(async move {
        info!(
            "Starting cache sweeper with interval of {} ms",
            interval.as_millis()
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let Some(target) = target.upgrade() else {
                break;
            };
            target.sync_event_and_clear_expired().await;
        }

        debug!("Cache sweeper stopped: adapter dropped");
    }))
}
