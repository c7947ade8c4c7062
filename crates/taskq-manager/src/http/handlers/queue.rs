//! Task status and sweep control handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use taskq_core::TaskId;

use crate::http::responses::{CleanupResponse, ErrorResponse, MessageResponse, TaskListResponse};
use crate::state::AppState;

/// Get one task's status.
pub async fn get_task(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.manager.get_status(&TaskId::from(id.as_str())) {
        Some(record) => Json(record).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Task not found: {id}"),
            }),
        )
            .into_response(),
    }
}

/// List every tracked task.
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(TaskListResponse {
        tasks: state.manager.list_all(),
    })
}

/// Start the cleanup sweep.
pub async fn start_queue(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let message = if state.start_sweep() {
        info!("Cleanup sweep started via API");
        "Queue sweep started"
    } else {
        "Queue sweep already running"
    };
    Json(MessageResponse {
        message: message.to_string(),
    })
}

/// Stop the cleanup sweep.
pub async fn stop_queue(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let message = if state.stop_sweep() {
        info!("Cleanup sweep stopped via API");
        "Queue sweep stopped"
    } else {
        "Queue sweep was not running"
    };
    Json(MessageResponse {
        message: message.to_string(),
    })
}

/// Evict terminal tasks now.
pub async fn cleanup_queue(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(CleanupResponse {
        removed: state.manager.cleanup(),
    })
}
