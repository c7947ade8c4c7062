//! End-to-end polling against a live status API.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use taskq_core::{OperationError, TaskStatus};
use taskq_manager::{http, AppState, Callbacks, Config, HttpStatusFetcher, QueueManager};

fn fast_config() -> Config {
    Config {
        poll_interval: Duration::from_millis(50),
        retry_delay: Duration::from_millis(50),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_local_task_follows_remote_status() {
    // Remote side: a queue exposing its tasks over HTTP
    let config = fast_config();
    let remote = QueueManager::new(&config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = http::create_router(AppState::new(remote.clone(), &config));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let remote_id = remote.submit(
        "generate-document",
        || async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, OperationError>(())
        },
        Callbacks::none(),
    );

    // Local side: tracks the same work, learns completion only by polling
    let local = QueueManager::new(&config);
    let local_id = local.submit(
        "generate-document",
        std::future::pending::<Result<(), OperationError>>,
        Callbacks::none(),
    );
    let fetcher = HttpStatusFetcher::new(&format!("http://{addr}")).with_remote_id(remote_id.clone());
    assert!(local.start_polling(&local_id, Arc::new(fetcher)));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while local.is_polling(&local_id) {
        assert!(tokio::time::Instant::now() < deadline, "poller never observed completion");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let record = local.get_status(&local_id).unwrap();
    assert_eq!(record.status, TaskStatus::Completed);
    assert_eq!(record.progress, 100);
    assert_eq!(
        record.metadata.get("id").and_then(|v| v.as_str()),
        Some(remote_id.as_str())
    );
}

#[tokio::test]
async fn test_polling_unknown_remote_task_keeps_going() {
    let config = fast_config();
    let remote = QueueManager::new(&config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = http::create_router(AppState::new(remote, &config));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let local = QueueManager::new(&config);
    let local_id = local.submit(
        "orphan",
        std::future::pending::<Result<(), OperationError>>,
        Callbacks::none(),
    );
    let fetcher = HttpStatusFetcher::new(&format!("http://{addr}"));
    assert!(local.start_polling(&local_id, Arc::new(fetcher)));

    // Every fetch is a 404; the poller logs and carries on
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(local.is_polling(&local_id));
    assert_eq!(local.get_status(&local_id).unwrap().status, TaskStatus::Running);
}
