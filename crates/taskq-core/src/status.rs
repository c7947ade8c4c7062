//! Task lifecycle status and its state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a tracked task.
///
/// ```text
/// pending -> running -> completed
///               |  ^ -> failed
///               v  |
///             retrying
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Submitted, execution not yet started.
    #[default]
    Pending,
    /// Operation is currently being awaited.
    Running,
    /// Last attempt was rate limited; waiting out the retry delay.
    Retrying,
    /// Operation succeeded.
    Completed,
    /// Operation failed terminally.
    Failed,
}

impl TaskStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [TaskStatus; 5] = [
        Self::Pending,
        Self::Running,
        Self::Retrying,
        Self::Completed,
        Self::Failed,
    ];

    /// Returns true if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the task is still active (not terminal).
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if `self -> next` is an edge of the state machine.
    ///
    /// Staying in the same state is not an edge; callers treat it as a no-op.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Retrying)
                | (Retrying, Running)
        )
    }

    /// Lowercase name, as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Retrying => "retrying",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Pending.is_active());
        assert!(TaskStatus::Running.is_active());
        assert!(TaskStatus::Retrying.is_active());
    }

    #[test]
    fn test_no_transition_out_of_terminal() {
        for terminal in [TaskStatus::Completed, TaskStatus::Failed] {
            for next in TaskStatus::ALL {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn test_pending_is_never_reentered() {
        for from in TaskStatus::ALL {
            assert!(!from.can_transition_to(TaskStatus::Pending));
        }
    }

    #[test]
    fn test_pending_cannot_skip_running() {
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Failed));
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Retrying));
        assert!(!TaskStatus::Retrying.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&TaskStatus::Retrying).unwrap();
        assert_eq!(json, "\"retrying\"");
        let parsed: TaskStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, TaskStatus::Completed);
    }
}
