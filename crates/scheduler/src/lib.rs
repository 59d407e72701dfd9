//! Tick schedulers for tickwork.
//!
//! This crate provides the scheduler seam a task driver resubmits itself
//! through, with a host-driven reference implementation and a tokio-driven
//! one.

#![warn(missing_docs)]

pub mod config;
pub mod manual;
pub mod tokio_tick;
pub mod trait_;

mod queue;

pub use config::SchedulerConfig;
pub use manual::ManualTickScheduler;
pub use tokio_tick::TokioTickScheduler;
pub use trait_::{Result, Runnable, SchedulerError, TickScheduler};
