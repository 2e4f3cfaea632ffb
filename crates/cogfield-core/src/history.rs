//! Bounded FIFO sample buffers.
//!
//! A [`ChannelHistory`] keeps the most recent `capacity` samples of one
//! channel. Pushing into a full buffer evicts the oldest sample first. The
//! buffer does no locking of its own; the analyzer serializes access.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default capacity for per-channel signal histories.
pub const DEFAULT_HISTORY_CAPACITY: usize = 60;

/// Fixed-capacity, append-only sample buffer with oldest-first eviction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelHistory {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl ChannelHistory {
    /// Creates an empty history. A zero capacity is promoted to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest one when full.
    pub fn push(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// Current samples, oldest to newest.
    #[must_use]
    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    /// The most recent `n` samples (fewer if the history is shorter).
    #[must_use]
    pub fn tail(&self, n: usize) -> Vec<f64> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).copied().collect()
    }

    #[must_use]
    pub fn last(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for ChannelHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
