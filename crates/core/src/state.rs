//! Task lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Task state.
///
/// `Cancelled` is never stored by a task driver. It is an overlay reported
/// by state queries once the task's completion handle has been cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TaskState {
    /// Waiting for its first activation
    Scheduled = 0,
    /// Activated at least once and not yet finished
    Running = 1,
    /// Operation finished without error
    Succeeded = 2,
    /// Operation raised a domain error
    Failed = 3,
    /// Cancellation was requested on the completion handle
    Cancelled = 4,
}

impl TaskState {
    /// Whether no further activation-driven transition can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Raw representation, for storage in an atomic cell.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Inverse of [`TaskState::as_u8`].
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Scheduled),
            1 => Some(Self::Running),
            2 => Some(Self::Succeeded),
            3 => Some(Self::Failed),
            4 => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Scheduled => write!(f, "scheduled"),
            TaskState::Running => write!(f, "running"),
            TaskState::Succeeded => write!(f, "succeeded"),
            TaskState::Failed => write!(f, "failed"),
            TaskState::Cancelled => write!(f, "cancelled"),
        }
    }
}
