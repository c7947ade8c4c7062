//! Periodic eviction of terminal task records.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::manager::QueueManager;

/// Background task calling [`QueueManager::cleanup`] on a fixed interval.
///
/// Stops when [`CleanupSweep::stop`] is called or the handle is dropped.
pub struct CleanupSweep {
    handle: JoinHandle<()>,
}

impl CleanupSweep {
    /// Start sweeping `manager` every `period`. The first sweep runs one
    /// period after start.
    pub fn start(manager: QueueManager, period: Duration) -> Self {
        info!(interval_secs = period.as_secs(), "Cleanup sweep started");

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = manager.cleanup();
                debug!(removed, remaining = manager.task_count(), "Cleanup sweep");
            }
        });

        Self { handle }
    }

    /// Returns true while the sweep task is alive.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the sweep.
    pub fn stop(self) {
        self.handle.abort();
        info!("Cleanup sweep stopped");
    }
}

impl Drop for CleanupSweep {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
