//! Tracks live tasks for monitoring.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tickwork_core::TaskId;
use tracing::debug;

use crate::task::{Task, TaskInfo};

type Registry = Mutex<HashMap<TaskId, Arc<dyn Task>>>;

/// Keeps a list of tasks until each one settles.
#[derive(Clone, Default)]
pub struct Supervisor {
    tasks: Arc<Registry>,
}

impl Supervisor {
    /// Create an empty supervisor.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(tasks: &Registry) -> MutexGuard<'_, HashMap<TaskId, Arc<dyn Task>>> {
        tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking a task. It is dropped again once it settles.
    pub fn monitor(&self, task: Arc<dyn Task>) {
        let id = task.id();
        Self::lock(&self.tasks).insert(id, Arc::clone(&task));
        debug!("Monitoring task {}", id);

        let tasks = Arc::downgrade(&self.tasks);
        task.on_done(Box::new(move || {
            if let Some(tasks) = tasks.upgrade() {
                Self::lock(&tasks).remove(&id);
                debug!("Task {} settled, no longer monitored", id);
            }
        }));
    }

    /// Tasks not yet settled, oldest first.
    pub fn tasks(&self) -> Vec<Arc<dyn Task>> {
        let mut tasks: Vec<_> = Self::lock(&self.tasks).values().cloned().collect();
        tasks.sort_by_key(|task| (task.created_at(), task.id()));
        tasks
    }

    /// Summaries of the tasks not yet settled, oldest first.
    pub fn snapshot(&self) -> Vec<TaskInfo> {
        self.tasks().iter().map(|task| task.info()).collect()
    }

    /// Look up a live task.
    pub fn get(&self, id: TaskId) -> Option<Arc<dyn Task>> {
        Self::lock(&self.tasks).get(&id).cloned()
    }

    /// Number of tasks not yet settled.
    pub fn len(&self) -> usize {
        Self::lock(&self.tasks).len()
    }

    /// Whether every monitored task has settled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Request cancellation of every live task. Returns how many accepted.
    pub fn cancel_all(&self) -> usize {
        self.tasks().iter().filter(|task| task.cancel()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OperationTask;
    use std::fmt;
    use std::time::Duration;
    use tickwork_core::{Operation, OperationError, Resume, RunContext, TaskState};
    use tickwork_scheduler::ManualTickScheduler;

    /// Needs two resumptions.
    struct TwoSteps {
        first: bool,
    }

    impl fmt::Display for TwoSteps {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "two steps")
        }
    }

    impl Operation for TwoSteps {
        fn resume(self: Arc<Self>, _ctx: &dyn RunContext) -> Result<Resume, OperationError> {
            if self.first {
                Ok(Resume::Continue(Arc::new(TwoSteps { first: false })))
            } else {
                Ok(Resume::Done)
            }
        }
    }

    fn submit(
        scheduler: &Arc<ManualTickScheduler>,
        supervisor: &Supervisor,
        name: &str,
    ) -> Arc<OperationTask> {
        let task = OperationTask::builder()
            .operation(Arc::new(TwoSteps { first: true }))
            .scheduler(scheduler.clone())
            .name(name)
            .build()
            .unwrap();
        supervisor.monitor(task.clone());
        task.submit_to_scheduler();
        task
    }

    #[test]
    fn test_settled_tasks_are_dropped() {
        let scheduler = Arc::new(ManualTickScheduler::new());
        let supervisor = Supervisor::new();
        let task = submit(&scheduler, &supervisor, "a");

        assert_eq!(supervisor.len(), 1);
        assert!(supervisor.get(task.id()).is_some());

        scheduler.run_until_idle(10);
        assert_eq!(task.state(), TaskState::Succeeded);
        assert!(supervisor.is_empty());
    }

    #[test]
    fn test_snapshot_is_ordered_by_creation() {
        let scheduler = Arc::new(ManualTickScheduler::new());
        let supervisor = Supervisor::new();
        submit(&scheduler, &supervisor, "first");
        std::thread::sleep(Duration::from_millis(2));
        submit(&scheduler, &supervisor, "second");

        let names: Vec<_> = supervisor
            .snapshot()
            .into_iter()
            .map(|info| info.name.unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_cancel_all() {
        let scheduler = Arc::new(ManualTickScheduler::new());
        let supervisor = Supervisor::new();
        let a = submit(&scheduler, &supervisor, "a");
        let b = submit(&scheduler, &supervisor, "b");

        assert_eq!(supervisor.cancel_all(), 2);
        assert!(supervisor.is_empty());
        assert_eq!(a.state(), TaskState::Cancelled);
        assert_eq!(b.state(), TaskState::Cancelled);

        scheduler.run_until_idle(10);
        assert_eq!(a.activations(), 0);
    }

    #[test]
    fn test_monitoring_a_settled_task() {
        let scheduler = Arc::new(ManualTickScheduler::new());
        let supervisor = Supervisor::new();
        let task = OperationTask::new(Arc::new(TwoSteps { first: false }), scheduler.clone());
        task.submit_to_scheduler();
        scheduler.run_until_idle(10);

        supervisor.monitor(task);
        assert!(supervisor.is_empty());
    }
}
