//! Errors raised while setting up tasks.

/// Error type for task operations.
pub type Result<T> = std::result::Result<T, TaskError>;

/// Errors that can occur while building or submitting a task.
///
/// Failures of the operation itself are not task errors. They are published
/// on the task's completion handle as an
/// [`OperationError`](tickwork_core::OperationError).
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// A required input was missing
    #[error("invalid argument: {0} is required")]
    InvalidArgument(&'static str),

    /// Invalid driver configuration
    #[error("invalid task config: {0}")]
    Config(String),
}
