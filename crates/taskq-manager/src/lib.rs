//! taskq Queue Manager
//!
//! Runs submitted asynchronous operations to a terminal state, retrying
//! rate-limited failures after a fixed cool-down, optionally polling a
//! remote status source, and periodically evicting finished records.

pub mod config;
pub mod fetcher;
pub mod http;
pub mod manager;
pub mod metrics;
mod poller;
pub mod retry;
pub mod state;
pub mod sweep;

pub use config::Config;
pub use fetcher::{transport_error, FetchError, FnStatusFetcher, HttpStatusFetcher, StatusFetcher};
pub use manager::{Callbacks, QueueManager, TaskEvent};
pub use retry::{ErrorClassifier, MarkerClassifier, RetryPolicy};
pub use state::AppState;
pub use sweep::CleanupSweep;
