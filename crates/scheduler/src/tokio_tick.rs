//! Tick scheduler driven by a tokio interval.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::queue::TickQueue;
use crate::trait_::{Result, Runnable, TickScheduler};

struct Submission {
    work: Arc<dyn Runnable>,
    due: u64,
}

/// A scheduler that ticks on a background tokio task.
///
/// Work runs inline on the tick loop, one unit at a time, so every unit is
/// expected to give control back within its own time budget.
pub struct TokioTickScheduler {
    sender: mpsc::UnboundedSender<Submission>,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
    tick: Arc<AtomicU64>,
    pending: Arc<AtomicUsize>,
}

impl TokioTickScheduler {
    /// Start the tick loop on the current tokio runtime.
    pub fn start(config: SchedulerConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let tick = Arc::new(AtomicU64::new(0));
        let pending = Arc::new(AtomicUsize::new(0));

        let handle = runtime.spawn(tick_loop(
            config,
            receiver,
            shutdown_rx,
            Arc::clone(&tick),
            Arc::clone(&pending),
        ));

        info!("Tick scheduler started with a {}ms period", config.tick_period_ms);

        Ok(Arc::new(Self {
            sender,
            shutdown,
            handle: Mutex::new(Some(handle)),
            tick,
            pending,
        }))
    }

    /// Number of ticks run so far.
    pub fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// Number of submitted units of work not yet run.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Stop the tick loop and wait for it to exit. Queued work is abandoned.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Tick loop ended abnormally: {}", e);
            }
        }
    }
}

impl TickScheduler for TokioTickScheduler {
    fn schedule(&self, work: Arc<dyn Runnable>, delay: u64) {
        let due = self.current_tick().saturating_add(1).saturating_add(delay);
        self.pending.fetch_add(1, Ordering::AcqRel);
        if let Err(rejected) = self.sender.send(Submission { work, due }) {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            warn!("Tick loop has stopped, abandoning scheduled work");
            rejected.0.work.abandon();
        }
    }
}

impl Drop for TokioTickScheduler {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn tick_loop(
    config: SchedulerConfig,
    mut receiver: mpsc::UnboundedReceiver<Submission>,
    mut shutdown: watch::Receiver<bool>,
    tick: Arc<AtomicU64>,
    pending: Arc<AtomicUsize>,
) {
    let mut interval = time::interval(config.tick_period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut queue = TickQueue::default();

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }

        let now = tick.fetch_add(1, Ordering::AcqRel) + 1;
        while let Ok(submission) = receiver.try_recv() {
            queue.push(submission.work, submission.due);
        }

        let due = queue.take_due(now, config.max_work_per_tick);
        for work in due {
            pending.fetch_sub(1, Ordering::AcqRel);
            work.run();
        }
    }

    receiver.close();
    while let Ok(submission) = receiver.try_recv() {
        queue.push(submission.work, submission.due);
    }

    let left = queue.drain();
    debug!(
        "Tick loop stopped at tick {}, abandoning {} queued",
        tick.load(Ordering::Acquire),
        left.len()
    );
    for work in left {
        pending.fetch_sub(1, Ordering::AcqRel);
        work.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Counter(AtomicUsize);

    impl Runnable for Counter {
        fn run(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Tracked {
        runs: AtomicUsize,
        abandoned: AtomicUsize,
    }

    impl Runnable for Tracked {
        fn run(self: Arc<Self>) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }

        fn abandon(self: Arc<Self>) {
            self.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Repeater {
        scheduler: Arc<TokioTickScheduler>,
        runs: AtomicUsize,
        limit: usize,
    }

    impl Runnable for Repeater {
        fn run(self: Arc<Self>) {
            let runs = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            if runs < self.limit {
                let scheduler = Arc::clone(&self.scheduler);
                scheduler.schedule(self, 0);
            }
        }
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig::new().with_tick_period(Duration::from_millis(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_scheduled_work() {
        let scheduler = TokioTickScheduler::start(config()).unwrap();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        scheduler.schedule(counter.clone(), 0);

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubmitted_work_keeps_running() {
        let scheduler = TokioTickScheduler::start(config()).unwrap();
        let repeater = Arc::new(Repeater {
            scheduler: Arc::clone(&scheduler),
            runs: AtomicUsize::new(0),
            limit: 4,
        });
        scheduler.schedule(repeater.clone(), 0);

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(repeater.runs.load(Ordering::SeqCst), 4);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_postpones_work() {
        let scheduler = TokioTickScheduler::start(config()).unwrap();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        scheduler.schedule(counter.clone(), 5);

        time::sleep(Duration::from_millis(25)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_after_shutdown_is_abandoned() {
        let scheduler = TokioTickScheduler::start(config()).unwrap();
        scheduler.shutdown().await;

        let work = Arc::new(Tracked::default());
        scheduler.schedule(work.clone(), 0);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(work.runs.load(Ordering::SeqCst), 0);
        assert_eq!(work.abandoned.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_queued_work() {
        let scheduler = TokioTickScheduler::start(config()).unwrap();
        let due_soon = Arc::new(Tracked::default());
        let due_later = Arc::new(Tracked::default());
        scheduler.schedule(due_soon.clone(), 0);
        scheduler.schedule(due_later.clone(), 100);

        time::sleep(Duration::from_millis(25)).await;
        scheduler.shutdown().await;

        assert_eq!(due_soon.runs.load(Ordering::SeqCst), 1);
        assert_eq!(due_soon.abandoned.load(Ordering::SeqCst), 0);
        assert_eq!(due_later.runs.load(Ordering::SeqCst), 0);
        assert_eq!(due_later.abandoned.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_start_needs_runtime() {
        assert!(TokioTickScheduler::start(config()).is_err());
    }
}
