//! Task driver configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, TaskError};

/// Configuration for [`OperationTask`](crate::OperationTask) drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Time budget handed to the operation on every activation, in ms
    pub budget_ms: u64,
    /// Ticks to wait before the next activation when work remains
    pub resubmit_delay: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            budget_ms: 20,
            resubmit_delay: 0,
        }
    }
}

impl DriverConfig {
    /// Create a new config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-activation budget.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the resubmission delay in ticks.
    pub fn with_resubmit_delay(mut self, ticks: u64) -> Self {
        self.resubmit_delay = ticks;
        self
    }

    /// Per-activation budget as a duration.
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    /// Reject configs a driver cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.budget_ms == 0 {
            return Err(TaskError::Config("budget must be at least 1ms".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_is_twenty_ms() {
        let config = DriverConfig::default();
        assert_eq!(config.budget(), Duration::from_millis(20));
        assert_eq!(config.resubmit_delay, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_budget_rejected() {
        let config = DriverConfig::new().with_budget(Duration::ZERO);
        assert!(matches!(config.validate(), Err(TaskError::Config(_))));
    }

    #[test]
    fn test_json_overrides() {
        let config: DriverConfig = serde_json::from_str(r#"{"budget_ms": 5}"#).unwrap();
        assert_eq!(config.budget(), Duration::from_millis(5));
        assert_eq!(config.resubmit_delay, 0);
    }
}
