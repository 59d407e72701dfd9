//! Domain errors raised by operations.

/// Error raised by an operation while it is being resumed.
///
/// A task that sees one of these stops driving the operation and publishes
/// the error on its completion handle. Nothing retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// The operation failed for a domain-specific reason
    #[error("{0}")]
    Failed(String),

    /// The operation hit a configured limit
    #[error("limit of {limit} exceeded")]
    LimitExceeded {
        /// The limit that was hit
        limit: u64,
    },

    /// The operation was interrupted before it could finish
    #[error("operation interrupted")]
    Interrupted,
}

impl OperationError {
    /// Shorthand for [`OperationError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}
