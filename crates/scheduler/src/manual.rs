//! Host-driven tick scheduler.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::config::SchedulerConfig;
use crate::queue::TickQueue;
use crate::trait_::{Runnable, TickScheduler};

struct State {
    tick: u64,
    queue: TickQueue,
}

/// A scheduler whose ticks are driven by the host calling [`tick`].
///
/// Work submitted while a tick is running, even with a delay of zero,
/// runs on a later tick, so a task that keeps resubmitting itself gets
/// exactly one activation per tick.
///
/// [`tick`]: ManualTickScheduler::tick
pub struct ManualTickScheduler {
    state: Mutex<State>,
    max_work_per_tick: Option<NonZeroUsize>,
}

impl ManualTickScheduler {
    /// Create a scheduler that runs everything due on each tick.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                tick: 0,
                queue: TickQueue::default(),
            }),
            max_work_per_tick: None,
        }
    }

    /// Create a scheduler honoring the config's per-tick cap.
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            max_work_per_tick: config.max_work_per_tick,
            ..Self::new()
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance one tick and run the work due on it.
    ///
    /// Returns how many units of work ran.
    pub fn tick(&self) -> usize {
        let due = {
            let mut state = self.lock();
            state.tick += 1;
            let now = state.tick;
            state.queue.take_due(now, self.max_work_per_tick)
        };

        let ran = due.len();
        for work in due {
            work.run();
        }
        ran
    }

    /// Tick until nothing is queued or `max_ticks` ticks have passed.
    ///
    /// Returns how many ticks ran.
    pub fn run_until_idle(&self, max_ticks: u64) -> u64 {
        let mut ticks = 0;
        while ticks < max_ticks && self.pending() > 0 {
            self.tick();
            ticks += 1;
        }
        if self.pending() > 0 {
            debug!("Stopped after {} ticks with {} pending", ticks, self.pending());
        }
        ticks
    }

    /// Number of queued units of work.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Number of ticks run so far.
    pub fn current_tick(&self) -> u64 {
        self.lock().tick
    }
}

impl Default for ManualTickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TickScheduler for ManualTickScheduler {
    fn schedule(&self, work: Arc<dyn Runnable>, delay: u64) {
        let mut state = self.lock();
        let due = state.tick.saturating_add(1).saturating_add(delay);
        state.queue.push(work, due);
    }
}
