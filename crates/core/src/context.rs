//! Run contexts handed to operations on every resumption.

use std::time::{Duration, Instant};

/// Tells a resuming operation whether it may keep working.
pub trait RunContext: Send + Sync {
    /// Whether the operation should keep going before it yields.
    fn should_continue(&self) -> bool;

    /// The total budget of this context, if bounded.
    fn budget(&self) -> Option<Duration>;
}

/// A run context bounded by wall-clock time.
///
/// The deadline is fixed when the context is created, so a fresh context
/// must be built for every activation.
#[derive(Debug, Clone, Copy)]
pub struct TimedRunContext {
    budget: Duration,
    deadline: Instant,
}

impl TimedRunContext {
    /// Create a context that expires `budget` from now.
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            deadline: Instant::now() + budget,
        }
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

impl RunContext for TimedRunContext {
    fn should_continue(&self) -> bool {
        Instant::now() < self.deadline
    }

    fn budget(&self) -> Option<Duration> {
        Some(self.budget)
    }
}

/// A run context that never asks the operation to yield.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnboundedRunContext;

impl RunContext for UnboundedRunContext {
    fn should_continue(&self) -> bool {
        true
    }

    fn budget(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_context_expires() {
        let ctx = TimedRunContext::new(Duration::from_millis(10));
        assert!(ctx.should_continue());
        assert_eq!(ctx.budget(), Some(Duration::from_millis(10)));

        std::thread::sleep(Duration::from_millis(15));
        assert!(!ctx.should_continue());
        assert_eq!(ctx.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_zero_budget_is_already_expired() {
        let ctx = TimedRunContext::new(Duration::ZERO);
        assert!(!ctx.should_continue());
    }

    #[test]
    fn test_unbounded_context() {
        let ctx = UnboundedRunContext;
        assert!(ctx.should_continue());
        assert!(ctx.budget().is_none());
    }
}
