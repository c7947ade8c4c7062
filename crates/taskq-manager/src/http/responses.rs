//! HTTP response types.

use serde::Serialize;

use taskq_core::TaskRecord;

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response for the task list endpoint.
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskRecord>,
}

/// Response for the sweep control endpoints.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response for the cleanup endpoint.
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
}
