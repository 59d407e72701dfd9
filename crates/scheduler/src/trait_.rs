//! Scheduler trait abstraction.

use std::sync::Arc;

/// Error type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors that can occur while setting up a scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Invalid configuration
    #[error("invalid scheduler config: {0}")]
    Config(String),

    /// The scheduler needs a running tokio runtime
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// A unit of work the scheduler can invoke.
pub trait Runnable: Send + Sync {
    /// Run the work once.
    fn run(self: Arc<Self>);

    /// Called instead of [`run`](Runnable::run) when the scheduler stops
    /// before the work's tick comes.
    fn abandon(self: Arc<Self>) {}
}

/// Accepts work to run later on the host's own tick cadence.
///
/// Implementations must never invoke the same submission twice, and must
/// never run two units of work at the same time.
pub trait TickScheduler: Send + Sync {
    /// Run `work` after `delay` further ticks. A delay of zero means the
    /// next tick.
    ///
    /// Scheduling never fails from the caller's point of view. A scheduler
    /// that can no longer run work abandons it instead.
    fn schedule(&self, work: Arc<dyn Runnable>, delay: u64);
}
