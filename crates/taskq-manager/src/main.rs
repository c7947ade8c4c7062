//! taskq status server.
//!
//! Runs a queue manager with its cleanup sweep and serves the HTTP status API.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskq_core::OperationError;
use taskq_manager::{http, AppState, Callbacks, Config, QueueManager};

/// taskq status server.
#[derive(Parser, Debug)]
#[command(name = "taskq-server", about = "Task queue manager with HTTP status API")]
struct Args {
    /// HTTP server address
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: String,

    /// Retry ceiling for submitted tasks
    #[arg(long, default_value = "3")]
    max_retries: u32,

    /// Cool-down after a rate-limited attempt (seconds)
    #[arg(long, default_value = "20")]
    retry_delay_secs: u64,

    /// Remote status polling interval (seconds)
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_secs: u64,

    /// Interval between evictions of finished tasks (seconds)
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..))]
    cleanup_interval_secs: u64,

    /// Submit a few simulated tasks on startup
    #[arg(long)]
    demo: bool,
}

impl Args {
    fn into_config(self) -> Config {
        Config {
            bind_addr: self.bind,
            default_max_retries: self.max_retries,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            cleanup_interval: Duration::from_secs(self.cleanup_interval_secs),
            ..Config::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let demo = args.demo;
    let config = args.into_config();
    let addr: SocketAddr = config.bind_addr.parse()?;

    let manager = QueueManager::new(&config);
    let state = AppState::new(manager.clone(), &config);
    state.start_sweep();

    if demo {
        submit_demo_tasks(&manager);
    }

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, http::create_router(state.clone()))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    state.stop_sweep();
    info!("Shut down");
    Ok(())
}

/// One task that succeeds, one rate limited twice before succeeding, one that
/// fails outright.
fn submit_demo_tasks(manager: &QueueManager) {
    manager.submit(
        "demo-outline",
        || async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, OperationError>("outline ready")
        },
        Callbacks::default().on_success(|out| info!(result = out, "demo-outline finished")),
    );

    let attempts = Arc::new(AtomicU32::new(0));
    manager.submit(
        "demo-chapter",
        move || {
            let attempts = attempts.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(OperationError::http(429, "Rate limit reached for requests"))
                } else {
                    Ok("chapter drafted")
                }
            }
        },
        Callbacks::default().on_success(|out| info!(result = out, "demo-chapter finished")),
    );

    manager.submit(
        "demo-invalid",
        || async { Err::<(), _>(OperationError::http(401, "invalid api key")) },
        Callbacks::default().on_failure(|e| info!(error = %e, "demo-invalid failed as expected")),
    );
}
