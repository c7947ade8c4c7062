//! Queue manager configuration.

use std::time::Duration;

use taskq_core::DEFAULT_MAX_RETRIES;

/// Queue manager configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP status API bind address.
    pub bind_addr: String,

    /// Retry ceiling applied by `QueueManager::submit`.
    pub default_max_retries: u32,

    /// Fixed cool-down between a rate-limited attempt and the next one.
    pub retry_delay: Duration,

    /// Interval between remote status fetches of a poller.
    pub poll_interval: Duration,

    /// Interval between sweeps evicting terminal records.
    pub cleanup_interval: Duration,

    /// Substrings that mark an error message as a rate-limit failure.
    pub rate_limit_markers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            default_max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_secs(20),
            poll_interval: Duration::from_secs(2),
            cleanup_interval: Duration::from_secs(60),
            rate_limit_markers: vec!["限流".to_string(), "rate limit".to_string()],
        }
    }
}
