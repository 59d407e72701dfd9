//! Resumable operations.
//!
//! An operation is a value standing for "the rest of the work". Resuming it
//! under a [`RunContext`] either finishes the work or hands back a new value
//! for what remains. Operations must give control back once the context
//! says to stop.

use std::fmt;
use std::sync::Arc;

use crate::context::{RunContext, UnboundedRunContext};
use crate::error::OperationError;
use crate::progress::Progress;

/// Shared handle to a type-erased operation.
pub type DynOperation = Arc<dyn Operation>;

/// Outcome of resuming an operation.
pub enum Resume {
    /// Work remains, continue with this operation next time
    Continue(DynOperation),
    /// No work remains
    Done,
}

impl Resume {
    /// Whether no work remains.
    pub fn is_done(&self) -> bool {
        matches!(self, Resume::Done)
    }
}

impl fmt::Debug for Resume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resume::Continue(next) => f
                .debug_tuple("Continue")
                .field(&format_args!("{}", next))
                .finish(),
            Resume::Done => f.write_str("Done"),
        }
    }
}

/// A unit of work that can be advanced in bounded steps.
///
/// `Display` is used as the operation's identity in diagnostics.
pub trait Operation: fmt::Display + Send + Sync {
    /// Advance the work until it finishes or `ctx` asks to stop.
    fn resume(self: Arc<Self>, ctx: &dyn RunContext) -> Result<Resume, OperationError>;

    /// Progress snapshot. Must not block.
    fn progress(&self) -> Progress {
        Progress::indeterminate()
    }

    /// Called once when the operation is abandoned without finishing.
    fn cancel(&self) {}
}

/// Runs several operations one after the other.
///
/// Resuming the queue keeps moving to the next member while the context
/// allows, so short members can share a single activation.
pub struct OperationQueue {
    label: String,
    members: Arc<[DynOperation]>,
    index: usize,
    current: Option<DynOperation>,
}

impl OperationQueue {
    /// Create a queue over the given operations.
    pub fn new(label: impl Into<String>, members: Vec<DynOperation>) -> Self {
        Self {
            label: label.into(),
            members: members.into(),
            index: 0,
            current: None,
        }
    }

    /// Number of member operations.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the queue has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of members already finished.
    pub fn finished(&self) -> usize {
        self.index
    }

    fn advanced(&self, index: usize, current: Option<DynOperation>) -> DynOperation {
        Arc::new(Self {
            label: self.label.clone(),
            members: Arc::clone(&self.members),
            index,
            current,
        })
    }
}

impl fmt::Display for OperationQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.label, self.index, self.members.len())
    }
}

impl Operation for OperationQueue {
    fn resume(self: Arc<Self>, ctx: &dyn RunContext) -> Result<Resume, OperationError> {
        let mut index = self.index;
        let mut current = self.current.clone();

        loop {
            let op = match current.take() {
                Some(op) => op,
                None => match self.members.get(index) {
                    Some(op) => Arc::clone(op),
                    None => return Ok(Resume::Done),
                },
            };

            match op.resume(ctx)? {
                Resume::Continue(next) => {
                    return Ok(Resume::Continue(self.advanced(index, Some(next))));
                }
                Resume::Done => {
                    index += 1;
                    if index >= self.members.len() {
                        return Ok(Resume::Done);
                    }
                    if !ctx.should_continue() {
                        return Ok(Resume::Continue(self.advanced(index, None)));
                    }
                }
            }
        }
    }

    fn progress(&self) -> Progress {
        let total = self.members.len();
        if total == 0 || self.index >= total {
            return Progress::completed();
        }

        let partial = self
            .current
            .as_ref()
            .and_then(|op| op.progress().fraction())
            .unwrap_or(0.0);
        Progress::of((self.index as f64 + partial) / total as f64)
    }

    fn cancel(&self) {
        match &self.current {
            Some(op) => op.cancel(),
            None => {
                if let Some(op) = self.members.get(self.index) {
                    op.cancel();
                }
            }
        }
    }
}

/// Helpers for driving operations outside a scheduler.
pub struct Operations;

impl Operations {
    /// Resume an operation until it finishes, ignoring any time budget.
    ///
    /// Blocks the caller for as long as the work takes.
    pub fn complete_blindly(op: DynOperation) -> Result<(), OperationError> {
        let ctx = UnboundedRunContext;
        let mut next = op;
        loop {
            match next.resume(&ctx)? {
                Resume::Continue(remaining) => next = remaining,
                Resume::Done => return Ok(()),
            }
        }
    }

    /// Resume an operation once under `ctx`.
    pub fn resume_once(op: &DynOperation, ctx: &dyn RunContext) -> Result<Resume, OperationError> {
        Arc::clone(op).resume(ctx)
    }
}
