//! Bounded per-table outcome history.
//!
//! Holds the most recent outcomes newest-first. The feed already returns
//! a capped newest-first window, so the normal path replaces the whole
//! buffer each cycle; `push_newest` exists for incremental replays.

use std::collections::VecDeque;

use crate::types::Outcome;

/// Default number of outcomes kept per table.
pub const DEFAULT_CAPACITY: usize = 500;

/// Fixed-capacity, newest-first record of outcomes.
///
/// Invariant: `len() <= capacity()`.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<Outcome>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Replace the contents with the latest newest-first batch from the feed.
    /// Anything beyond capacity is dropped from the old end.
    pub fn record(&mut self, outcomes: &[Outcome]) {
        self.entries.clear();
        self.entries
            .extend(outcomes.iter().take(self.capacity).copied());
    }

    /// Insert a single newer outcome, evicting the oldest when full.
    pub fn push_newest(&mut self, outcome: Outcome) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(outcome);
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The k-th most recent outcome (0 = newest).
    pub fn peek(&self, k: usize) -> Option<Outcome> {
        self.entries.get(k).copied()
    }

    /// Up to `n` most recent outcomes, newest first.
    pub fn latest(&self, n: usize) -> Vec<Outcome> {
        self.entries.iter().take(n).copied().collect()
    }

    /// Newest-first iteration.
    pub fn iter(&self) -> impl Iterator<Item = Outcome> + '_ {
        self.entries.iter().copied()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
