//! Task record and its lifecycle transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CoreError, StatusUpdate, TaskId, TaskStatus};

/// Default ceiling on retry attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Tracked state of one submitted operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique task identifier.
    pub id: TaskId,

    /// Caller-supplied label, for diagnostics only.
    pub name: String,

    /// Current lifecycle status.
    pub status: TaskStatus,

    /// Retry attempts consumed so far.
    pub retry_count: u32,

    /// Ceiling on `retry_count`, fixed at creation.
    pub max_retries: u32,

    /// Completion percentage in `0..=100`.
    pub progress: u8,

    /// When the task was submitted.
    pub created_at: DateTime<Utc>,

    /// When the task first entered `running`.
    pub started_at: Option<DateTime<Utc>>,

    /// When the task entered `completed` or `failed`.
    pub completed_at: Option<DateTime<Utc>>,

    /// Last error message, set when the task failed.
    pub error: Option<String>,

    /// Opaque fields merged from remote status updates.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl TaskRecord {
    /// Create a new pending TaskRecord.
    pub fn new(name: impl Into<String>, max_retries: u32) -> Self {
        Self {
            id: TaskId::generate(),
            name: name.into(),
            status: TaskStatus::Pending,
            retry_count: 0,
            max_retries,
            progress: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
            metadata: Map::new(),
        }
    }

    /// Builder method to set a specific ID (useful for testing).
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next`, stamping timestamps on entry.
    ///
    /// Returns `Ok(false)` if the task is already in `next`.
    fn transition(&mut self, next: TaskStatus) -> Result<bool, CoreError> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        match next {
            TaskStatus::Running if self.started_at.is_none() => {
                self.started_at = Some(Utc::now());
            }
            TaskStatus::Completed | TaskStatus::Failed => {
                self.completed_at = Some(Utc::now());
            }
            _ => {}
        }
        Ok(true)
    }

    /// Mark the first attempt as started.
    pub fn start(&mut self) -> Result<(), CoreError> {
        if self.status != TaskStatus::Pending {
            return Err(CoreError::InvalidStateTransition {
                from: self.status,
                to: TaskStatus::Running,
            });
        }
        self.transition(TaskStatus::Running).map(|_| ())
    }

    /// Mark the task as waiting out a retry delay.
    pub fn schedule_retry(&mut self) -> Result<(), CoreError> {
        if self.retry_count >= self.max_retries {
            return Err(CoreError::InvalidStateTransition {
                from: self.status,
                to: TaskStatus::Retrying,
            });
        }
        self.transition(TaskStatus::Retrying).map(|_| ())
    }

    /// Re-enter `running` after a retry delay, consuming one retry.
    pub fn resume(&mut self) -> Result<(), CoreError> {
        if self.status != TaskStatus::Retrying {
            return Err(CoreError::InvalidStateTransition {
                from: self.status,
                to: TaskStatus::Running,
            });
        }
        self.transition(TaskStatus::Running)?;
        self.retry_count = (self.retry_count + 1).min(self.max_retries);
        Ok(())
    }

    /// Mark the task as completed.
    pub fn complete(&mut self) -> Result<(), CoreError> {
        self.transition(TaskStatus::Completed)?;
        self.progress = 100;
        Ok(())
    }

    /// Mark the task as failed.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), CoreError> {
        self.transition(TaskStatus::Failed)?;
        self.progress = 0;
        self.error = Some(error.into());
        Ok(())
    }

    /// Merge a remote status update field by field.
    ///
    /// Fields absent from the update are preserved. Local execution owns the
    /// non-terminal statuses, so a remote `pending`, `running` or `retrying`
    /// only contributes its progress and opaque fields. A remote terminal
    /// status is applied when it is a legal transition; `error` is taken only
    /// from a `failed` update.
    ///
    /// A rejected update leaves the record untouched. Once terminal, a record
    /// only accepts opaque fields from updates repeating its own status.
    pub fn merge(&mut self, update: &StatusUpdate) -> Result<(), CoreError> {
        let rejected = CoreError::InvalidStateTransition {
            from: self.status,
            to: update.status,
        };

        if self.is_terminal() {
            if update.status != self.status {
                return Err(rejected);
            }
            self.merge_extra(update);
            return Ok(());
        }

        if !update.status.is_terminal() {
            if let Some(progress) = update.progress {
                self.progress = progress.min(100);
            }
            self.merge_extra(update);
            return Ok(());
        }

        if !self.status.can_transition_to(update.status) {
            return Err(rejected);
        }
        self.merge_extra(update);
        self.transition(update.status)?;
        match update.status {
            TaskStatus::Completed => {
                self.progress = 100;
                self.error = None;
            }
            TaskStatus::Failed => {
                self.progress = 0;
                if let Some(error) = &update.error {
                    self.error = Some(error.clone());
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn merge_extra(&mut self, update: &StatusUpdate) {
        for (key, value) in &update.extra {
            self.metadata.insert(key.clone(), value.clone());
        }
    }
}
