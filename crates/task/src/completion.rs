//! Completion handle shared between a task and its observers.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tickwork_core::OperationError;
use tokio::sync::watch;

/// How a task ended.
#[derive(Clone)]
pub enum Outcome<T> {
    /// The work finished and produced a value
    Succeeded(T),
    /// The work raised a domain error
    Failed(OperationError),
    /// Someone cancelled the task before it settled
    Cancelled,
}

impl<T> Outcome<T> {
    /// Whether this is a successful outcome.
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Outcome::Succeeded(_))
    }

    /// The error, if the work failed.
    pub fn error(&self) -> Option<&OperationError> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl<T> fmt::Debug for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Succeeded(_) => f.write_str("Succeeded"),
            Outcome::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
            Outcome::Cancelled => f.write_str("Cancelled"),
        }
    }
}

type Listener<T> = Box<dyn FnOnce(&Outcome<T>) + Send>;

struct Inner<T> {
    outcome: Option<Outcome<T>>,
    listeners: Vec<Listener<T>>,
}

/// A future-like slot that settles exactly once.
///
/// The first call to [`set_result`], [`set_error`] or [`cancel`] wins; later
/// calls change nothing and return `false`. Listeners run on whichever
/// thread settles the handle, before waiters are woken.
///
/// [`set_result`]: Completion::set_result
/// [`set_error`]: Completion::set_error
/// [`cancel`]: Completion::cancel
pub struct Completion<T> {
    inner: Mutex<Inner<T>>,
    cancelled: AtomicBool,
    done: watch::Sender<bool>,
}

impl<T: Clone + Send + Sync + 'static> Completion<T> {
    /// Create an unsettled handle.
    pub fn new() -> Self {
        let (done, _) = watch::channel(false);
        Self {
            inner: Mutex::new(Inner {
                outcome: None,
                listeners: Vec::new(),
            }),
            cancelled: AtomicBool::new(false),
            done,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, outcome: Outcome<T>) -> bool {
        let listeners = {
            let mut inner = self.lock();
            if inner.outcome.is_some() {
                return false;
            }
            if matches!(outcome, Outcome::Cancelled) {
                self.cancelled.store(true, Ordering::SeqCst);
            }
            inner.outcome = Some(outcome.clone());
            std::mem::take(&mut inner.listeners)
        };

        for listener in listeners {
            listener(&outcome);
        }
        self.done.send_replace(true);
        true
    }

    /// Settle with a value.
    pub fn set_result(&self, value: T) -> bool {
        self.settle(Outcome::Succeeded(value))
    }

    /// Settle with an error.
    pub fn set_error(&self, error: OperationError) -> bool {
        self.settle(Outcome::Failed(error))
    }

    /// Request cancellation. Settles the handle as cancelled if it has not
    /// settled yet.
    pub fn cancel(&self) -> bool {
        self.settle(Outcome::Cancelled)
    }

    /// Whether cancellation was requested before the handle settled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the handle has settled. Already true inside listeners.
    pub fn is_done(&self) -> bool {
        self.lock().outcome.is_some()
    }

    /// The outcome, if settled.
    pub fn outcome(&self) -> Option<Outcome<T>> {
        self.lock().outcome.clone()
    }

    /// Run `listener` once the handle settles, or right away if it already has.
    pub fn on_complete<F>(&self, listener: F)
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        let settled = {
            let mut inner = self.lock();
            match &inner.outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    inner.listeners.push(Box::new(listener));
                    return;
                }
            }
        };
        listener(&settled);
    }

    /// Wait until the handle settles.
    pub async fn wait(&self) -> Outcome<T> {
        let mut done = self.done.subscribe();
        loop {
            if *done.borrow_and_update() {
                if let Some(outcome) = self.outcome() {
                    return outcome;
                }
            }
            // the sender lives in `self`, so this only returns on a change
            let _ = done.changed().await;
        }
    }

    /// Wait until the handle settles or `timeout` passes.
    pub async fn wait_timeout(&self, timeout: Duration) -> Option<Outcome<T>> {
        tokio::time::timeout(timeout, self.wait()).await.ok()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}
