use std::sync::atomic::{AtomicUsize, Ordering};

use crate::wordlist::Candidate;

/// Fixed-size queue of one session's candidates.
///
/// Popping is a single atomic increment, so any number of workers can drain it without a
/// lock. `processed` is bumped once per popped candidate when its probe has finished.
#[derive(Debug)]
pub struct TaskQueue {
    items: Vec<Candidate>,
    next: AtomicUsize,
    processed: AtomicUsize,
}

impl TaskQueue {
    pub fn new<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = Candidate>,
    {
        Self {
            items: candidates.into_iter().collect(),
            next: AtomicUsize::new(0),
            processed: AtomicUsize::new(0),
        }
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn pop(&self) -> Option<&Candidate> {
        let idx = self.next.fetch_add(1, Ordering::AcqRel);
        self.items.get(idx)
    }

    pub fn mark_processed(&self) {
        self.processed.fetch_add(1, Ordering::AcqRel);
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire).min(self.items.len())
    }

    /// Candidates not yet handed to a worker.
    pub fn pending(&self) -> usize {
        let popped = self.next.load(Ordering::Acquire).min(self.items.len());
        self.items.len() - popped
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }
}
