//! Prometheus text-format metrics for the queue.

use std::fmt::Write;

use taskq_core::TaskStatus;

use crate::manager::QueueManager;

/// Render task and poller gauges in Prometheus exposition format.
pub fn collect_metrics(manager: &QueueManager) -> String {
    let mut output = String::new();

    let tasks = manager.list_all();
    writeln!(output, "# HELP taskq_tasks_total Number of tracked tasks by status").ok();
    writeln!(output, "# TYPE taskq_tasks_total gauge").ok();
    for status in TaskStatus::ALL {
        let count = tasks.iter().filter(|t| t.status == status).count();
        writeln!(output, "taskq_tasks_total{{status=\"{status}\"}} {count}").ok();
    }

    let retries: u64 = tasks.iter().map(|t| u64::from(t.retry_count)).sum();
    writeln!(output, "# HELP taskq_task_retries Retries consumed by tracked tasks").ok();
    writeln!(output, "# TYPE taskq_task_retries gauge").ok();
    writeln!(output, "taskq_task_retries {retries}").ok();

    writeln!(output, "# HELP taskq_pollers_active Active status pollers").ok();
    writeln!(output, "# TYPE taskq_pollers_active gauge").ok();
    writeln!(output, "taskq_pollers_active {}", manager.poller_count()).ok();

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_collect_metrics_empty_queue() {
        let manager = QueueManager::new(&Config::default());
        let output = collect_metrics(&manager);

        assert!(output.contains("taskq_tasks_total{status=\"pending\"} 0"));
        assert!(output.contains("taskq_tasks_total{status=\"retrying\"} 0"));
        assert!(output.contains("taskq_task_retries 0"));
        assert!(output.contains("taskq_pollers_active 0"));
    }
}
