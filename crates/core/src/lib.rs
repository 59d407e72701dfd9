//! tickwork core data models.
//!
//! This crate defines the values that flow between a task driver, the
//! operations it resumes, and whoever watches the task: identities,
//! lifecycle states, progress snapshots, run contexts and the operation
//! contract itself.

#![warn(missing_docs)]

// Identity and lifecycle
mod id;
mod state;

// Operation contract
mod context;
mod error;
mod operation;
mod progress;

// Re-exports
pub use id::TaskId;
pub use state::TaskState;

pub use context::{RunContext, TimedRunContext, UnboundedRunContext};
pub use error::OperationError;
pub use operation::{DynOperation, Operation, OperationQueue, Operations, Resume};
pub use progress::Progress;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
