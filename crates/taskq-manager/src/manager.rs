//! Queue manager - owns task records, runs operations, retries rate limits.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use taskq_core::{CoreError, OperationError, StatusUpdate, TaskId, TaskRecord, TaskStatus};

use crate::config::Config;
use crate::fetcher::StatusFetcher;
use crate::poller;
use crate::retry::RetryPolicy;

/// Capacity of the transition broadcast channel.
const EVENT_CAPACITY: usize = 256;

/// A status transition observed on a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvent {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub retry_count: u32,
}

type SuccessCallback<T> = Box<dyn FnOnce(T) + Send>;
type FailureCallback = Box<dyn FnOnce(OperationError) + Send>;

/// Optional completion callbacks for a submitted operation.
pub struct Callbacks<T> {
    on_success: Option<SuccessCallback<T>>,
    on_failure: Option<FailureCallback>,
}

impl<T> Callbacks<T> {
    /// No callbacks.
    pub fn none() -> Self {
        Self {
            on_success: None,
            on_failure: None,
        }
    }

    /// Builder method to set the success callback.
    pub fn on_success(mut self, f: impl FnOnce(T) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Builder method to set the failure callback.
    pub fn on_failure(mut self, f: impl FnOnce(OperationError) + Send + 'static) -> Self {
        self.on_failure = Some(Box::new(f));
        self
    }
}

impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Self::none()
    }
}

struct Inner {
    /// Task records indexed by TaskId.
    tasks: Mutex<HashMap<TaskId, TaskRecord>>,

    /// Active status pollers indexed by TaskId.
    pollers: Mutex<HashMap<TaskId, JoinHandle<()>>>,

    policy: RetryPolicy,
    default_max_retries: u32,
    poll_interval: Duration,
    events: broadcast::Sender<TaskEvent>,
}

/// Client-side task queue.
///
/// Cheap to clone; all clones share the same tables. Callers only ever get
/// task IDs and snapshot copies of records.
#[derive(Clone)]
pub struct QueueManager {
    inner: Arc<Inner>,
}

impl QueueManager {
    /// Create a manager configured by `config`.
    pub fn new(config: &Config) -> Self {
        Self::with_policy(config, RetryPolicy::from_config(config))
    }

    /// Create a manager with an explicit retry policy.
    pub fn with_policy(config: &Config, policy: RetryPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                tasks: Mutex::new(HashMap::new()),
                pollers: Mutex::new(HashMap::new()),
                policy,
                default_max_retries: config.default_max_retries,
                poll_interval: config.poll_interval,
                events,
            }),
        }
    }

    /// Submit an operation with the configured retry ceiling.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<F, Fut, T>(
        &self,
        name: impl Into<String>,
        operation: F,
        callbacks: Callbacks<T>,
    ) -> TaskId
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, OperationError>> + Send + 'static,
        T: Send + 'static,
    {
        self.submit_with_retries(name, self.inner.default_max_retries, operation, callbacks)
    }

    /// Submit an operation with an explicit retry ceiling.
    ///
    /// The record is registered as `pending` before this returns; execution
    /// happens on a spawned task. `operation` may be invoked more than once.
    pub fn submit_with_retries<F, Fut, T>(
        &self,
        name: impl Into<String>,
        max_retries: u32,
        operation: F,
        callbacks: Callbacks<T>,
    ) -> TaskId
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, OperationError>> + Send + 'static,
        T: Send + 'static,
    {
        let record = TaskRecord::new(name, max_retries);
        let task_id = record.id.clone();

        info!(task_id = %task_id, name = %record.name, max_retries, "Task submitted");

        self.tasks().insert(task_id.clone(), record);
        self.emit(&task_id, TaskStatus::Pending, 0);

        let manager = self.clone();
        let id = task_id.clone();
        tokio::spawn(async move {
            manager.execute(id, operation, callbacks).await;
        });

        task_id
    }

    /// Snapshot of one task.
    pub fn get_status(&self, task_id: &TaskId) -> Option<TaskRecord> {
        self.tasks().get(task_id).cloned()
    }

    /// Snapshot of every tracked task, in no particular order.
    pub fn list_all(&self) -> Vec<TaskRecord> {
        self.tasks().values().cloned().collect()
    }

    /// Number of tracked tasks.
    pub fn task_count(&self) -> usize {
        self.tasks().len()
    }

    /// Evict every terminal record and stop any poller still attached to it.
    ///
    /// Returns the number of records removed.
    pub fn cleanup(&self) -> usize {
        let removed: Vec<TaskId> = {
            let mut tasks = self.tasks();
            let ids: Vec<TaskId> = tasks
                .values()
                .filter(|r| r.is_terminal())
                .map(|r| r.id.clone())
                .collect();
            for id in &ids {
                tasks.remove(id);
            }
            ids
        };

        for id in &removed {
            self.stop_polling(id);
        }

        if !removed.is_empty() {
            debug!(removed = removed.len(), "Evicted terminal tasks");
        }
        removed.len()
    }

    /// Attach a status poller to a tracked task.
    ///
    /// Returns false without side effects if the task is unknown, already
    /// terminal, or already has a poller.
    pub fn start_polling(&self, task_id: &TaskId, fetcher: Arc<dyn StatusFetcher>) -> bool {
        // Hold the poller table while checking the record. Execution settles
        // the record before it detaches pollers, so a task finishing
        // concurrently either is seen as terminal here or detaches this one.
        let mut pollers = self.pollers();
        if pollers.contains_key(task_id) {
            debug!(task_id = %task_id, "Poller already attached");
            return false;
        }
        match self.get_status(task_id) {
            Some(record) if !record.is_terminal() => {}
            _ => return false,
        }

        let handle = tokio::spawn(poller::run(
            self.clone(),
            task_id.clone(),
            fetcher,
            self.inner.poll_interval,
        ));
        pollers.insert(task_id.clone(), handle);

        info!(
            task_id = %task_id,
            interval_ms = self.inner.poll_interval.as_millis() as u64,
            "Status polling started"
        );
        true
    }

    /// Returns true if a poller is attached to the task.
    pub fn is_polling(&self, task_id: &TaskId) -> bool {
        self.pollers().contains_key(task_id)
    }

    /// Number of active pollers.
    pub fn poller_count(&self) -> usize {
        self.pollers().len()
    }

    /// Subscribe to status transitions of all tasks.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.inner.events.subscribe()
    }

    /// Merge a remote status update into a record.
    ///
    /// Returns the snapshot after merging, or `None` if the record is gone.
    pub(crate) fn merge_update(
        &self,
        task_id: &TaskId,
        update: &StatusUpdate,
    ) -> Option<TaskRecord> {
        let result = self.update_record(task_id, |record| record.merge(update));
        match result {
            Ok(record) => Some(record),
            Err(CoreError::TaskNotFound(_)) => None,
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Ignoring remote status");
                self.get_status(task_id)
            }
        }
    }

    /// Remove a poller's handle without aborting it. Used by the poller itself.
    pub(crate) fn detach_poller(&self, task_id: &TaskId) {
        self.pollers().remove(task_id);
    }

    /// Abort and remove the poller attached to a task, if any.
    fn stop_polling(&self, task_id: &TaskId) {
        if let Some(handle) = self.pollers().remove(task_id) {
            handle.abort();
            debug!(task_id = %task_id, "Status polling stopped");
        }
    }

    /// Run one task's attempt/retry chain to a terminal state.
    async fn execute<F, Fut, T>(&self, task_id: TaskId, mut operation: F, callbacks: Callbacks<T>)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
    {
        if let Err(e) = self.update_record(&task_id, TaskRecord::start) {
            warn!(task_id = %task_id, error = %e, "Task could not start");
            return;
        }
        debug!(task_id = %task_id, "Task running");

        loop {
            let err = match operation().await {
                Ok(value) => {
                    let completed = self.update_record(&task_id, TaskRecord::complete);
                    self.stop_polling(&task_id);
                    match completed {
                        Ok(record) => {
                            info!(
                                task_id = %task_id,
                                name = %record.name,
                                retry_count = record.retry_count,
                                "Task completed"
                            );
                            if let Some(on_success) = callbacks.on_success {
                                on_success(value);
                            }
                        }
                        Err(e) => {
                            debug!(task_id = %task_id, error = %e, "Result discarded, already settled");
                        }
                    }
                    return;
                }
                Err(err) => err,
            };

            let record = match self.get_status(&task_id) {
                Some(record) if !record.is_terminal() => record,
                _ => {
                    debug!(task_id = %task_id, error = %err, "Failure discarded, already settled");
                    self.stop_polling(&task_id);
                    return;
                }
            };

            if self.inner.policy.should_retry(&err, record.retry_count, record.max_retries) {
                if let Err(e) = self.update_record(&task_id, TaskRecord::schedule_retry) {
                    debug!(task_id = %task_id, error = %e, "Retry abandoned");
                    return;
                }

                let delay = self.inner.policy.delay();
                warn!(
                    task_id = %task_id,
                    name = %record.name,
                    attempt = record.retry_count + 1,
                    max_retries = record.max_retries,
                    delay_secs = delay.as_secs(),
                    error = %err,
                    "Rate limited, retrying"
                );
                tokio::time::sleep(delay).await;

                if let Err(e) = self.update_record(&task_id, TaskRecord::resume) {
                    debug!(task_id = %task_id, error = %e, "Retry abandoned");
                    self.stop_polling(&task_id);
                    return;
                }
                continue;
            }

            let message = err.to_string();
            let failed = self.update_record(&task_id, |r| r.fail(message.clone()));
            self.stop_polling(&task_id);
            match failed {
                Ok(record) => {
                    error!(
                        task_id = %task_id,
                        name = %record.name,
                        retry_count = record.retry_count,
                        error = %message,
                        "Task failed"
                    );
                    if let Some(on_failure) = callbacks.on_failure {
                        on_failure(err);
                    }
                }
                Err(e) => {
                    debug!(task_id = %task_id, error = %e, "Failure discarded, already settled");
                }
            }
            return;
        }
    }

    /// Apply `f` to a record, broadcasting the new status if it changed.
    fn update_record<F>(&self, task_id: &TaskId, f: F) -> Result<TaskRecord, CoreError>
    where
        F: FnOnce(&mut TaskRecord) -> Result<(), CoreError>,
    {
        let (before, after) = {
            let mut tasks = self.tasks();
            let record = tasks
                .get_mut(task_id)
                .ok_or_else(|| CoreError::TaskNotFound(task_id.to_string()))?;
            let before = (record.status, record.retry_count);
            f(record)?;
            (before, record.clone())
        };

        if before != (after.status, after.retry_count) {
            self.emit(task_id, after.status, after.retry_count);
        }
        Ok(after)
    }

    fn emit(&self, task_id: &TaskId, status: TaskStatus, retry_count: u32) {
        // No subscribers is fine.
        let _ = self.inner.events.send(TaskEvent {
            task_id: task_id.clone(),
            status,
            retry_count,
        });
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<TaskId, TaskRecord>> {
        self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pollers(&self) -> MutexGuard<'_, HashMap<TaskId, JoinHandle<()>>> {
        self.inner.pollers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
