//! Task driver for resumable operations.
//!
//! An [`OperationTask`] resumes its operation once per activation under a
//! fixed time budget. While work remains it hands itself back to the
//! scheduler; once the work finishes or fails it settles its completion
//! handle. The scheduler is the only thing that activates a task, and it
//! never runs two activations of one task at the same time, so the mutable
//! fields below have a single writer. They are still kept in atomics and
//! locks because state and progress queries come from other threads.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tickwork_core::{
    DynOperation, OperationError, Progress, Resume, TaskId, TaskState, Time, TimedRunContext,
};
use tickwork_scheduler::{Runnable, TickScheduler};
use tracing::{debug, trace};

use crate::completion::{Completion, Outcome};
use crate::config::DriverConfig;
use crate::error::{Result, TaskError};
use crate::reporter::{TaskReport, TaskReporter, TracingReporter};
use crate::task::Task;

/// What a single activation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Activation {
    /// Work remains and the task went back to the scheduler
    Resubmitted,
    /// The operation finished
    Succeeded,
    /// The operation raised an error
    Failed,
    /// Cancellation was observed, nothing was resubmitted
    Cancelled,
    /// The task had already settled
    Skipped,
}

/// Drives a resumable operation across scheduler ticks.
pub struct OperationTask {
    id: TaskId,
    name: Option<String>,
    owner: Option<String>,
    created_at: Time,
    initial: DynOperation,
    pending: RwLock<Option<DynOperation>>,
    resuming: AtomicBool,
    state: AtomicU8,
    elapsed_nanos: AtomicU64,
    activations: AtomicU64,
    scheduler: Arc<dyn TickScheduler>,
    completion: Arc<Completion<DynOperation>>,
    reporter: Arc<dyn TaskReporter>,
    config: DriverConfig,
}

impl OperationTask {
    /// Create a task with default settings.
    pub fn new(operation: DynOperation, scheduler: Arc<dyn TickScheduler>) -> Arc<Self> {
        Self::assemble(operation, scheduler, TaskBuilder::default())
    }

    /// Start building a task.
    pub fn builder() -> TaskBuilder {
        TaskBuilder::default()
    }

    fn assemble(
        operation: DynOperation,
        scheduler: Arc<dyn TickScheduler>,
        builder: TaskBuilder,
    ) -> Arc<Self> {
        let task = Arc::new(Self {
            id: TaskId::new(),
            name: builder.name,
            owner: builder.owner,
            created_at: chrono::Utc::now(),
            initial: Arc::clone(&operation),
            pending: RwLock::new(Some(operation)),
            resuming: AtomicBool::new(false),
            state: AtomicU8::new(TaskState::Scheduled.as_u8()),
            elapsed_nanos: AtomicU64::new(0),
            activations: AtomicU64::new(0),
            scheduler,
            completion: builder.completion.unwrap_or_default(),
            reporter: builder
                .reporter
                .unwrap_or_else(|| Arc::new(TracingReporter)),
            config: builder.config,
        });

        let weak = Arc::downgrade(&task);
        task.completion.on_complete(move |outcome| {
            if matches!(outcome, Outcome::Cancelled) {
                if let Some(task) = weak.upgrade() {
                    task.abandon_pending();
                }
            }
        });

        task
    }

    /// The operation this task was created with.
    pub fn operation(&self) -> &DynOperation {
        &self.initial
    }

    /// The completion handle this task settles.
    pub fn completion(&self) -> &Arc<Completion<DynOperation>> {
        &self.completion
    }

    /// Time spent inside resumptions so far.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::Acquire))
    }

    /// Number of activations so far.
    pub fn activations(&self) -> u64 {
        self.activations.load(Ordering::Acquire)
    }

    /// Driver settings.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Hand this task to the scheduler for its next activation.
    pub fn submit_to_scheduler(self: &Arc<Self>) {
        let work: Arc<dyn Runnable> = Arc::clone(self) as Arc<dyn Runnable>;
        self.scheduler.schedule(work, self.config.resubmit_delay);
    }

    /// Wait for the task to settle.
    pub async fn wait(&self) -> Outcome<DynOperation> {
        self.completion.wait().await
    }

    fn set_state(&self, state: TaskState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn pending_operation(&self) -> Option<DynOperation> {
        self.pending
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write_pending(&self) -> RwLockWriteGuard<'_, Option<DynOperation>> {
        self.pending.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the pending operation once the work is over.
    fn take_pending(&self) -> Option<DynOperation> {
        let mut pending = self.write_pending();
        self.resuming.store(false, Ordering::Release);
        pending.take()
    }

    /// Drop the pending operation after cancellation.
    ///
    /// While a resumption is in flight the operation being resumed is left
    /// alone; the activation cancels whatever it hands back instead.
    fn abandon_pending(&self) {
        let abandoned = {
            let mut pending = self.write_pending();
            if self.resuming.load(Ordering::Acquire) {
                None
            } else {
                pending.take()
            }
        };
        if let Some(op) = abandoned {
            self.abandon_operation(op);
        }
    }

    fn abandon_operation(&self, op: DynOperation) {
        debug!("Task {} cancelled, abandoning {}", self.id, op);
        op.cancel();
    }

    /// Pick the operation to resume and mark a resumption as in flight.
    fn begin_resumption(&self) -> std::result::Result<DynOperation, Activation> {
        let mut pending = self.write_pending();
        if self.completion.is_cancelled() {
            let abandoned = pending.take();
            drop(pending);
            if let Some(op) = abandoned {
                self.abandon_operation(op);
            }
            return Err(Activation::Cancelled);
        }
        match pending.clone() {
            Some(op) => {
                self.resuming.store(true, Ordering::Release);
                Ok(op)
            }
            None => Err(Activation::Skipped),
        }
    }

    /// Store what remains, unless cancellation got there first.
    fn store_remaining(&self, next: DynOperation) -> bool {
        let mut pending = self.write_pending();
        self.resuming.store(false, Ordering::Release);
        if self.completion.is_cancelled() {
            pending.take();
            drop(pending);
            self.abandon_operation(next);
            return false;
        }
        *pending = Some(next);
        true
    }

    fn report(&self) -> TaskReport<'_> {
        TaskReport {
            id: self.id,
            name: self.name.as_deref(),
            operation: self.initial.as_ref(),
            elapsed: self.elapsed(),
            activations: self.activations(),
        }
    }

    fn finish(&self) {
        self.take_pending();
        self.set_state(TaskState::Succeeded);
        self.reporter.succeeded(&self.report());
        if !self.completion.set_result(Arc::clone(&self.initial)) {
            trace!("Task {} finished after its handle settled", self.id);
        }
    }

    fn fail(&self, error: OperationError) {
        self.take_pending();
        self.set_state(TaskState::Failed);
        self.reporter.failed(&self.report(), &error);
        if !self.completion.set_error(error) {
            trace!("Task {} failed after its handle settled", self.id);
        }
    }

    /// Resume the pending operation once and decide what happens next.
    pub(crate) fn activate(self: &Arc<Self>) -> Activation {
        let op = match self.begin_resumption() {
            Ok(op) => op,
            Err(activation) => return activation,
        };

        self.set_state(TaskState::Running);
        self.activations.fetch_add(1, Ordering::AcqRel);

        let ctx = TimedRunContext::new(self.config.budget());
        let started = Instant::now();
        let resumed = op.resume(&ctx);
        let spent = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(spent, Ordering::AcqRel);

        match resumed {
            Ok(Resume::Continue(next)) => {
                if self.store_remaining(next) {
                    self.submit_to_scheduler();
                    Activation::Resubmitted
                } else {
                    debug!("Task {} cancelled mid-activation, not resubmitting", self.id);
                    Activation::Cancelled
                }
            }
            Ok(Resume::Done) => {
                self.finish();
                Activation::Succeeded
            }
            Err(e) => {
                self.fail(e);
                Activation::Failed
            }
        }
    }
}

impl Runnable for OperationTask {
    fn run(self: Arc<Self>) {
        let activation = self.activate();
        trace!("Task {} activation: {:?}", self.id, activation);
    }

    fn abandon(self: Arc<Self>) {
        if self.completion.cancel() {
            debug!("Task {} abandoned by its scheduler", self.id);
        }
    }
}

impl Task for OperationTask {
    fn id(&self) -> TaskId {
        self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn created_at(&self) -> Time {
        self.created_at
    }

    fn state(&self) -> TaskState {
        if self.completion.is_cancelled() {
            return TaskState::Cancelled;
        }
        TaskState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or(TaskState::Scheduled)
    }

    fn progress(&self) -> Progress {
        match self.pending_operation() {
            Some(op) => op.progress(),
            None => Progress::completed(),
        }
    }

    fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    fn cancel(&self) -> bool {
        self.completion.cancel()
    }

    fn on_done(&self, listener: Box<dyn FnOnce() + Send>) {
        self.completion.on_complete(move |_| listener());
    }
}

impl std::fmt::Debug for OperationTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationTask")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("operation", &format_args!("{}", self.initial))
            .field("state", &self.state())
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

/// Builder for [`OperationTask`].
#[derive(Default)]
pub struct TaskBuilder {
    operation: Option<DynOperation>,
    scheduler: Option<Arc<dyn TickScheduler>>,
    name: Option<String>,
    owner: Option<String>,
    completion: Option<Arc<Completion<DynOperation>>>,
    reporter: Option<Arc<dyn TaskReporter>>,
    config: DriverConfig,
}

impl TaskBuilder {
    /// Set the operation to drive.
    pub fn operation(mut self, operation: DynOperation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Set the scheduler the task resubmits itself to.
    pub fn scheduler(mut self, scheduler: Arc<dyn TickScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Set the task name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the task owner.
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Settle an existing completion handle instead of a fresh one.
    pub fn completion(mut self, completion: Arc<Completion<DynOperation>>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Set where finish diagnostics go.
    pub fn reporter(mut self, reporter: Arc<dyn TaskReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Set the driver configuration.
    pub fn config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the task. Nothing is scheduled yet.
    pub fn build(mut self) -> Result<Arc<OperationTask>> {
        let operation = self
            .operation
            .take()
            .ok_or(TaskError::InvalidArgument("operation"))?;
        let scheduler = self
            .scheduler
            .take()
            .ok_or(TaskError::InvalidArgument("scheduler"))?;
        self.config.validate()?;

        Ok(OperationTask::assemble(operation, scheduler, self))
    }
}
