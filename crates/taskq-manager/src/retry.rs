//! Retry decisions for failed operations.
//!
//! Only rate-limit failures are retried. The backend's limit resets on a
//! short fixed window, so the delay is constant rather than exponential.

use std::sync::Arc;
use std::time::Duration;

use taskq_core::OperationError;

use crate::config::Config;

/// HTTP status returned by rate-limited backends.
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Decides whether a failure is a rate-limit condition.
pub trait ErrorClassifier: Send + Sync {
    /// Returns true if `error` should be treated as rate limiting.
    fn is_rate_limited(&self, error: &OperationError) -> bool;
}

/// Classifies by HTTP 429 or by marker substrings in the message.
///
/// Markers are matched case-insensitively.
#[derive(Debug, Clone)]
pub struct MarkerClassifier {
    markers: Vec<String>,
}

impl MarkerClassifier {
    /// Create a classifier matching any of `markers`.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.into().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }
}

impl Default for MarkerClassifier {
    fn default() -> Self {
        Self::new(Config::default().rate_limit_markers)
    }
}

impl ErrorClassifier for MarkerClassifier {
    fn is_rate_limited(&self, error: &OperationError) -> bool {
        if error.status_code == Some(TOO_MANY_REQUESTS) {
            return true;
        }
        let Some(message) = error.message.as_deref() else {
            return false;
        };
        let message = message.to_lowercase();
        self.markers.iter().any(|marker| message.contains(marker.as_str()))
    }
}

impl<F> ErrorClassifier for F
where
    F: Fn(&OperationError) -> bool + Send + Sync,
{
    fn is_rate_limited(&self, error: &OperationError) -> bool {
        self(error)
    }
}

/// Retry policy: rate-limit failures only, fixed delay.
#[derive(Clone)]
pub struct RetryPolicy {
    classifier: Arc<dyn ErrorClassifier>,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy from a classifier and a fixed delay.
    pub fn new(classifier: Arc<dyn ErrorClassifier>, delay: Duration) -> Self {
        Self { classifier, delay }
    }

    /// Build the policy described by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(MarkerClassifier::new(config.rate_limit_markers.iter().cloned())),
            config.retry_delay,
        )
    }

    /// Check whether a failed attempt should be retried.
    pub fn should_retry(&self, error: &OperationError, retry_count: u32, max_retries: u32) -> bool {
        retry_count < max_retries && self.classifier.is_rate_limited(error)
    }

    /// Delay before the next attempt. Independent of the attempt number.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}
