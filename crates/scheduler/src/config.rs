//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::trait_::{Result, SchedulerError};

/// Configuration for tick-driven schedulers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Length of one host tick in milliseconds
    pub tick_period_ms: u64,
    /// Cap on units of work run per tick (None = run everything due)
    pub max_work_per_tick: Option<NonZeroUsize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 50, // 20 ticks per second
            max_work_per_tick: None,
        }
    }
}

impl SchedulerConfig {
    /// Create a new config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tick period.
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the per-tick work cap.
    pub fn with_max_work_per_tick(mut self, max: NonZeroUsize) -> Self {
        self.max_work_per_tick = Some(max);
        self
    }

    /// Tick period as a duration.
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Reject configs no scheduler can honor.
    pub fn validate(&self) -> Result<()> {
        if self.tick_period_ms == 0 {
            return Err(SchedulerError::Config("tick period must be at least 1ms".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tick_period(), Duration::from_millis(50));
        assert!(config.max_work_per_tick.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_period_rejected() {
        let config = SchedulerConfig::new().with_tick_period(Duration::ZERO);
        assert!(matches!(config.validate(), Err(SchedulerError::Config(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SchedulerConfig = serde_json::from_str(r#"{"tick_period_ms": 10}"#).unwrap();
        assert_eq!(config.tick_period_ms, 10);
        assert!(config.max_work_per_tick.is_none());

        let config: SchedulerConfig = serde_json::from_str(r#"{"max_work_per_tick": 4}"#).unwrap();
        assert_eq!(config.tick_period_ms, 50);
        assert_eq!(config.max_work_per_tick.map(NonZeroUsize::get), Some(4));
    }
}
