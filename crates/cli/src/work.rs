//! Synthetic chunked workload driven by the CLI.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tickwork_core::{Operation, OperationError, Progress, Resume, RunContext};

/// Performs `total` steps of fixed cost, as many per resumption as the
/// budget allows.
#[derive(Debug, Clone)]
pub struct ChunkedWork {
    total: u64,
    done: u64,
    step_cost: Duration,
    fail_at: Option<u64>,
}

impl ChunkedWork {
    /// Create a workload of `total` steps.
    pub fn new(total: u64, step_cost: Duration) -> Self {
        Self {
            total,
            done: 0,
            step_cost,
            fail_at: None,
        }
    }

    /// Raise an error when step `step` (1-based) is reached.
    pub fn failing_at(mut self, step: u64) -> Self {
        self.fail_at = Some(step);
        self
    }
}

impl fmt::Display for ChunkedWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunked work of {} steps", self.total)
    }
}

impl Operation for ChunkedWork {
    fn resume(self: Arc<Self>, ctx: &dyn RunContext) -> Result<Resume, OperationError> {
        let mut done = self.done;

        // always make progress, even when the budget is already spent
        loop {
            if done >= self.total {
                return Ok(Resume::Done);
            }
            if self.fail_at == Some(done + 1) {
                return Err(OperationError::failed(format!("step {} failed", done + 1)));
            }

            if !self.step_cost.is_zero() {
                std::thread::sleep(self.step_cost);
            }
            done += 1;

            if !ctx.should_continue() {
                break;
            }
        }

        if done >= self.total {
            return Ok(Resume::Done);
        }
        Ok(Resume::Continue(Arc::new(Self {
            done,
            ..(*self).clone()
        })))
    }

    fn progress(&self) -> Progress {
        if self.total == 0 {
            return Progress::completed();
        }
        Progress::of(self.done as f64 / self.total as f64)
    }
}
