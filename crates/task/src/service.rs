//! Entry point for submitting operations.

use std::sync::Arc;

use tickwork_core::DynOperation;
use tickwork_scheduler::TickScheduler;
use tracing::info;

use crate::config::DriverConfig;
use crate::error::Result;
use crate::operation_task::OperationTask;
use crate::reporter::{TaskReporter, TracingReporter};
use crate::supervisor::Supervisor;
use crate::task::Task;

/// Optional metadata for a submission.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    /// Task name
    pub name: Option<String>,
    /// Task owner
    pub owner: Option<String>,
}

impl SubmitRequest {
    /// Request with a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            owner: None,
        }
    }

    /// Set the owner.
    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// Builds, monitors and schedules tasks against one scheduler.
pub struct TaskService {
    scheduler: Arc<dyn TickScheduler>,
    supervisor: Supervisor,
    reporter: Arc<dyn TaskReporter>,
    config: DriverConfig,
}

impl TaskService {
    /// Create a service with default settings.
    pub fn new(scheduler: Arc<dyn TickScheduler>) -> Self {
        Self {
            scheduler,
            supervisor: Supervisor::new(),
            reporter: Arc::new(TracingReporter),
            config: DriverConfig::default(),
        }
    }

    /// Set the reporter handed to new tasks.
    pub fn with_reporter(mut self, reporter: Arc<dyn TaskReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Set the driver configuration for new tasks.
    pub fn with_config(mut self, config: DriverConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Create a task for `operation` and schedule its first activation.
    pub fn submit(
        &self,
        operation: DynOperation,
        request: SubmitRequest,
    ) -> Result<Arc<OperationTask>> {
        let mut builder = OperationTask::builder()
            .operation(operation)
            .scheduler(Arc::clone(&self.scheduler))
            .reporter(Arc::clone(&self.reporter))
            .config(self.config);
        if let Some(name) = request.name {
            builder = builder.name(name);
        }
        if let Some(owner) = request.owner {
            builder = builder.owner(owner);
        }

        let task = builder.build()?;
        self.supervisor.monitor(task.clone());
        task.submit_to_scheduler();

        info!("Submitted task {} for {}", task.id(), task.operation());
        Ok(task)
    }

    /// The supervisor tracking this service's live tasks.
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Driver configuration used for new tasks.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }
}
