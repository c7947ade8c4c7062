//! Core domain errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TaskStatus;

/// Core domain errors for taskq.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Task not found.
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Invalid state transition.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: TaskStatus, to: TaskStatus },
}

/// Failure raised by a submitted operation.
///
/// The transport layer that produced it may attach an HTTP-style status code,
/// a human-readable message, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    /// HTTP-style status code, if the failure came from an HTTP response.
    pub status_code: Option<u16>,

    /// Human-readable description.
    pub message: Option<String>,
}

impl OperationError {
    /// Failure carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            message: Some(message.into()),
        }
    }

    /// Failure carrying an HTTP status and a message.
    pub fn http(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            message: Some(message.into()),
        }
    }

    /// Failure carrying only an HTTP status.
    pub fn status(status_code: u16) -> Self {
        Self {
            status_code: Some(status_code),
            message: None,
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, self.status_code) {
            (Some(message), _) => f.write_str(message),
            (None, Some(code)) => write!(f, "HTTP {code}"),
            (None, None) => f.write_str("operation failed"),
        }
    }
}

impl std::error::Error for OperationError {}

impl From<String> for OperationError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for OperationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefers_message() {
        let err = OperationError::http(429, "Too Many Requests");
        assert_eq!(err.to_string(), "Too Many Requests");
    }

    #[test]
    fn test_display_falls_back_to_status() {
        assert_eq!(OperationError::status(503).to_string(), "HTTP 503");
        assert_eq!(OperationError::default().to_string(), "operation failed");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = CoreError::InvalidStateTransition {
            from: TaskStatus::Completed,
            to: TaskStatus::Running,
        };
        assert_eq!(err.to_string(), "Invalid state transition: completed -> running");
    }
}
