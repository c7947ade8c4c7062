//! Per-task status poller.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use taskq_core::TaskId;

use crate::fetcher::StatusFetcher;
use crate::manager::QueueManager;

/// Poll `fetcher` every `period` and merge results into the task's record.
///
/// Exits on its own once the merged record is terminal or has been evicted.
/// Fetch failures are logged and polling continues.
pub(crate) async fn run(
    manager: QueueManager,
    task_id: TaskId,
    fetcher: Arc<dyn StatusFetcher>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately; the first fetch happens one period in.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let update = match fetcher.fetch_status(&task_id).await {
            Ok(update) => update,
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Status fetch failed");
                continue;
            }
        };

        match manager.merge_update(&task_id, &update) {
            Some(record) if record.is_terminal() => {
                debug!(task_id = %task_id, status = %record.status, "Remote status terminal, polling stopped");
                break;
            }
            Some(record) => {
                debug!(task_id = %task_id, status = %record.status, progress = record.progress, "Status polled");
            }
            None => {
                debug!(task_id = %task_id, "Task evicted, polling stopped");
                break;
            }
        }
    }

    manager.detach_poller(&task_id);
}
