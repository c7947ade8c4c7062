//! taskq Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Runtime specifics (timers, spawning)
//!
//! Task records, their state machine, and the error shapes operations
//! report all live here.

pub mod error;
pub mod ids;
pub mod status;
pub mod task;
pub mod update;

// Re-export commonly used types
pub use error::{CoreError, OperationError};
pub use ids::TaskId;
pub use status::TaskStatus;
pub use task::{TaskRecord, DEFAULT_MAX_RETRIES};
pub use update::StatusUpdate;
