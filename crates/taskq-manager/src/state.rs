//! Shared application state for the HTTP status API.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::Config;
use crate::manager::QueueManager;
use crate::sweep::CleanupSweep;

/// Shared application state.
pub struct AppState {
    /// The queue whose tasks are exposed.
    pub manager: QueueManager,

    /// Running cleanup sweep, if started.
    sweep: Mutex<Option<CleanupSweep>>,

    cleanup_interval: Duration,
}

impl AppState {
    /// Create a new AppState wrapped in Arc. The sweep is not started.
    pub fn new(manager: QueueManager, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            manager,
            sweep: Mutex::new(None),
            cleanup_interval: config.cleanup_interval,
        })
    }

    /// Start the cleanup sweep. Returns false if it was already running.
    pub fn start_sweep(&self) -> bool {
        let mut sweep = self.sweep.lock().unwrap_or_else(PoisonError::into_inner);
        if sweep.as_ref().is_some_and(CleanupSweep::is_running) {
            return false;
        }
        *sweep = Some(CleanupSweep::start(self.manager.clone(), self.cleanup_interval));
        true
    }

    /// Stop the cleanup sweep. Returns false if it was not running.
    pub fn stop_sweep(&self) -> bool {
        let taken = self.sweep.lock().unwrap_or_else(PoisonError::into_inner).take();
        match taken {
            Some(sweep) => {
                sweep.stop();
                true
            }
            None => false,
        }
    }

    /// Returns true while the cleanup sweep is running.
    pub fn sweep_running(&self) -> bool {
        self.sweep
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(CleanupSweep::is_running)
    }
}
