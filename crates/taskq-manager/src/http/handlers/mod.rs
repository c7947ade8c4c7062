//! HTTP request handlers.

mod health;
mod queue;

pub use health::{health_check, metrics_handler};
pub use queue::{cleanup_queue, get_task, list_tasks, start_queue, stop_queue};
