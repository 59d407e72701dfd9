//! Due-tick queue shared by the scheduler implementations.

use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::trait_::Runnable;

struct Entry {
    due: u64,
    work: Arc<dyn Runnable>,
}

/// Work waiting for its tick, kept in submission order.
#[derive(Default)]
pub(crate) struct TickQueue {
    entries: Vec<Entry>,
}

impl TickQueue {
    pub(crate) fn push(&mut self, work: Arc<dyn Runnable>, due: u64) {
        self.entries.push(Entry { due, work });
    }

    /// Remove and return the work due at `now`, oldest submission first.
    /// Work over `cap` stays queued and is due again on the next tick.
    pub(crate) fn take_due(
        &mut self,
        now: u64,
        cap: Option<NonZeroUsize>,
    ) -> Vec<Arc<dyn Runnable>> {
        let limit = cap.map_or(usize::MAX, NonZeroUsize::get);
        let mut due = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());

        for entry in self.entries.drain(..) {
            if entry.due <= now && due.len() < limit {
                due.push(entry.work);
            } else {
                kept.push(entry);
            }
        }

        self.entries = kept;
        due
    }

    /// Remove everything still queued, due or not.
    pub(crate) fn drain(&mut self) -> Vec<Arc<dyn Runnable>> {
        self.entries.drain(..).map(|entry| entry.work).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tagged(usize, Arc<AtomicUsize>);

    impl Runnable for Tagged {
        fn run(self: Arc<Self>) {
            self.1.store(self.0, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_take_due_respects_tick_and_order() {
        let last = Arc::new(AtomicUsize::new(0));
        let mut queue = TickQueue::default();
        queue.push(Arc::new(Tagged(1, Arc::clone(&last))), 1);
        queue.push(Arc::new(Tagged(2, Arc::clone(&last))), 3);
        queue.push(Arc::new(Tagged(3, Arc::clone(&last))), 1);

        let due = queue.take_due(1, None);
        assert_eq!(due.len(), 2);
        assert_eq!(queue.len(), 1);

        for work in due {
            work.run();
        }
        // submission order: the entry tagged 3 runs last
        assert_eq!(last.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_take_due_caps_work() {
        let last = Arc::new(AtomicUsize::new(0));
        let mut queue = TickQueue::default();
        for tag in 0..5 {
            queue.push(Arc::new(Tagged(tag, Arc::clone(&last))), 0);
        }

        let due = queue.take_due(0, NonZeroUsize::new(2));
        assert_eq!(due.len(), 2);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_drain_empties_queue() {
        let last = Arc::new(AtomicUsize::new(0));
        let mut queue = TickQueue::default();
        queue.push(Arc::new(Tagged(1, Arc::clone(&last))), 1);
        queue.push(Arc::new(Tagged(2, Arc::clone(&last))), 50);

        assert_eq!(queue.drain().len(), 2);
        assert_eq!(queue.len(), 0);
        assert!(queue.take_due(100, None).is_empty());
    }
}
