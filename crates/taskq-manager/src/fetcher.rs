//! Remote status sources for pollers.

use std::future::Future;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use taskq_core::{OperationError, StatusUpdate, TaskId};

/// Errors returned while fetching remote status.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("unexpected status {status} for task {task_id}")]
    Status { status: u16, task_id: String },

    /// Payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Any other failure reported by a custom fetcher.
    #[error("{0}")]
    Other(String),
}

/// Source of remote status for a task.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    /// Fetch the current remote status of `task_id`.
    async fn fetch_status(&self, task_id: &TaskId) -> Result<StatusUpdate, FetchError>;
}

/// Adapts an async closure into a [`StatusFetcher`].
pub struct FnStatusFetcher<F> {
    f: F,
}

impl<F> FnStatusFetcher<F> {
    /// Wrap `f`, which is called with the task ID on every poll.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> StatusFetcher for FnStatusFetcher<F>
where
    F: Fn(TaskId) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StatusUpdate, FetchError>> + Send + 'static,
{
    async fn fetch_status(&self, task_id: &TaskId) -> Result<StatusUpdate, FetchError> {
        (self.f)(task_id.clone()).await
    }
}

/// Fetches status from a taskq HTTP status API.
///
/// By default the local task ID is used in the request path. When the
/// remote service tracks the work under its own ID, set it with
/// [`HttpStatusFetcher::with_remote_id`].
pub struct HttpStatusFetcher {
    inner: reqwest::Client,
    base_url: String,
    remote_id: Option<TaskId>,
}

impl HttpStatusFetcher {
    /// Create a fetcher against `base_url` (e.g. `http://127.0.0.1:8000`).
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            remote_id: None,
        }
    }

    /// Builder method to poll a remote ID instead of the local one.
    pub fn with_remote_id(mut self, remote_id: TaskId) -> Self {
        self.remote_id = Some(remote_id);
        self
    }

    fn status_url(&self, task_id: &TaskId) -> String {
        let id = self.remote_id.as_ref().unwrap_or(task_id);
        format!("{}/api/queue/status/{}", self.base_url, id)
    }
}

#[async_trait]
impl StatusFetcher for HttpStatusFetcher {
    async fn fetch_status(&self, task_id: &TaskId) -> Result<StatusUpdate, FetchError> {
        let url = self.status_url(task_id);
        debug!(url = %url, "GET status");

        let response = self.inner.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                task_id: task_id.to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// Convert a transport error into an operation failure, keeping the HTTP
/// status so rate-limit responses classify as retryable.
pub fn transport_error(err: &reqwest::Error) -> OperationError {
    OperationError {
        status_code: err.status().map(|s| s.as_u16()),
        message: Some(err.to_string()),
    }
}
