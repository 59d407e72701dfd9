//! Task drivers for tickwork.
//!
//! Wraps resumable operations in tasks that run a slice at a time on a
//! tick scheduler, and publishes each task's result on a completion handle.

#![warn(missing_docs)]

pub mod completion;
pub mod config;
pub mod error;
pub mod operation_task;
pub mod reporter;
pub mod service;
pub mod supervisor;
pub mod task;

pub use completion::{Completion, Outcome};
pub use config::DriverConfig;
pub use error::{Result, TaskError};
pub use operation_task::{OperationTask, TaskBuilder};
pub use reporter::{MemoryReporter, ReportRecord, TaskReport, TaskReporter, TracingReporter};
pub use service::{SubmitRequest, TaskService};
pub use supervisor::Supervisor;
pub use task::{Task, TaskInfo};
