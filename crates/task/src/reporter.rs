//! Diagnostics emitted when tasks finish.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tickwork_core::{Operation, OperationError, TaskId};
use tracing::{debug, warn};

/// What a task knew about itself when it finished.
pub struct TaskReport<'a> {
    /// Task id
    pub id: TaskId,
    /// Task name, if any
    pub name: Option<&'a str>,
    /// The operation the task was created with
    pub operation: &'a dyn Operation,
    /// Time spent inside resumptions, summed over all activations
    pub elapsed: Duration,
    /// Number of activations
    pub activations: u64,
}

/// Receives diagnostics from finishing tasks.
pub trait TaskReporter: Send + Sync {
    /// A task's operation finished.
    fn succeeded(&self, report: &TaskReport<'_>);

    /// A task's operation raised an error.
    fn failed(&self, _report: &TaskReport<'_>, _error: &OperationError) {}
}

/// Reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl TaskReporter for TracingReporter {
    fn succeeded(&self, report: &TaskReport<'_>) {
        debug!("{} took {}ms", report.operation, report.elapsed.as_millis());
    }

    fn failed(&self, report: &TaskReport<'_>, error: &OperationError) {
        warn!(
            "{} failed after {}ms: {}",
            report.operation,
            report.elapsed.as_millis(),
            error
        );
    }
}

/// One entry captured by [`MemoryReporter`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRecord {
    /// Task id
    pub id: TaskId,
    /// Task name
    pub name: Option<String>,
    /// Operation identity, as displayed
    pub operation: String,
    /// Elapsed active time
    pub elapsed: Duration,
    /// Number of activations
    pub activations: u64,
    /// The error, for failed tasks
    pub error: Option<OperationError>,
}

impl ReportRecord {
    fn from_report(report: &TaskReport<'_>, error: Option<&OperationError>) -> Self {
        Self {
            id: report.id,
            name: report.name.map(str::to_string),
            operation: report.operation.to_string(),
            elapsed: report.elapsed,
            activations: report.activations,
            error: error.cloned(),
        }
    }
}

/// Keeps reports in memory, for hosts that surface them in their own UI.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    records: Mutex<Vec<ReportRecord>>,
}

impl MemoryReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports captured so far, oldest first.
    pub fn records(&self) -> Vec<ReportRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, record: ReportRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

impl TaskReporter for MemoryReporter {
    fn succeeded(&self, report: &TaskReport<'_>) {
        self.push(ReportRecord::from_report(report, None));
    }

    fn failed(&self, report: &TaskReport<'_>, error: &OperationError) {
        self.push(ReportRecord::from_report(report, Some(error)));
    }
}
