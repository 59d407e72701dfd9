//! Task abstraction shared by every kind of scheduled work.

use serde::{Deserialize, Serialize};
use tickwork_core::{Progress, TaskId, TaskState, Time};

/// A piece of scheduled work that observers can inspect and cancel.
pub trait Task: Send + Sync {
    /// Unique id.
    fn id(&self) -> TaskId;

    /// Human readable name, for diagnostics.
    fn name(&self) -> Option<&str>;

    /// Who submitted the task, for diagnostics.
    fn owner(&self) -> Option<&str>;

    /// When the task was created.
    fn created_at(&self) -> Time;

    /// Current state. Reports `Cancelled` once cancellation was requested.
    fn state(&self) -> TaskState;

    /// Progress snapshot.
    fn progress(&self) -> Progress;

    /// Whether the task has settled.
    fn is_done(&self) -> bool;

    /// Request cancellation. Returns `false` if the task already settled.
    fn cancel(&self) -> bool;

    /// Run `listener` once the task settles, or right away if it already has.
    fn on_done(&self, listener: Box<dyn FnOnce() + Send>);

    /// Serializable summary of the task.
    fn info(&self) -> TaskInfo {
        TaskInfo {
            id: self.id(),
            name: self.name().map(str::to_string),
            owner: self.owner().map(str::to_string),
            created_at: self.created_at(),
            state: self.state(),
            progress: self.progress(),
        }
    }
}

/// A point-in-time summary of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Task id
    pub id: TaskId,
    /// Task name
    pub name: Option<String>,
    /// Task owner
    pub owner: Option<String>,
    /// Creation time
    pub created_at: Time,
    /// State when the summary was taken
    pub state: TaskState,
    /// Progress when the summary was taken
    pub progress: Progress,
}
