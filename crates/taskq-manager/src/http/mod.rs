//! HTTP status API for the queue.
//!
//! Provides endpoints for:
//! - Task status (`/api/queue/status`, `/api/queue/status/:id`)
//! - Sweep control (`/api/queue/start`, `/api/queue/stop`, `/api/queue/cleanup`)
//! - Health check (`/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Browser UIs poll this API from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/queue/status", get(handlers::list_tasks))
        .route("/api/queue/status/:id", get(handlers::get_task))
        .route("/api/queue/start", post(handlers::start_queue))
        .route("/api/queue/stop", post(handlers::stop_queue))
        .route("/api/queue/cleanup", post(handlers::cleanup_queue))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use taskq_core::{OperationError, TaskRecord, TaskStatus};

    use crate::config::Config;
    use crate::manager::{Callbacks, QueueManager};

    fn app_state() -> Arc<AppState> {
        let config = Config::default();
        AppState::new(QueueManager::new(&config), &config)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_get_unknown_task_is_404() {
        let app = create_router(app_state());
        let response = app
            .oneshot(Request::get("/api/queue/status/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn test_get_task_returns_record() {
        let state = app_state();
        let id = state.manager.submit(
            "outline",
            || async { Ok::<_, OperationError>(()) },
            Callbacks::none(),
        );
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::get(format!("/api/queue/status/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let record: TaskRecord = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.name, "outline");
    }

    #[tokio::test]
    async fn test_list_tasks() {
        let state = app_state();
        for name in ["a", "b"] {
            state
                .manager
                .submit(name, || async { Ok::<_, OperationError>(()) }, Callbacks::none());
        }
        let app = create_router(state);

        let response = app
            .oneshot(Request::get("/api/queue/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["tasks"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_start_and_stop_sweep() {
        let state = app_state();
        let app = create_router(state.clone());

        let response = app
            .clone()
            .oneshot(Request::post("/api/queue/start").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.sweep_running());

        let response = app
            .oneshot(Request::post("/api/queue/stop").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!state.sweep_running());
    }

    #[tokio::test]
    async fn test_cleanup_endpoint_evicts_terminal() {
        let state = app_state();
        let id = state.manager.submit(
            "done",
            || async { Ok::<_, OperationError>(()) },
            Callbacks::none(),
        );
        while state.manager.get_status(&id).map(|r| r.status) != Some(TaskStatus::Completed) {
            tokio::task::yield_now().await;
        }
        let app = create_router(state.clone());

        let response = app
            .oneshot(Request::post("/api/queue/cleanup").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["removed"], 1);
        assert!(state.manager.get_status(&id).is_none());
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(app_state());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
