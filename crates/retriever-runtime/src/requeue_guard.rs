//! [`RequeueGuard`] – stall detector for the collection queue.
//!
//! Every unreachable marker is moved to the back of the queue and the next
//! one is tried.  If *all* remaining markers stay unreachable the sequencer
//! would cycle forever, so the guard counts consecutive misses and trips once
//! the whole queue has been cycled `rounds` times without a single grasp.
//!
//! # Example
//!
//! ```rust
//! use retriever_runtime::requeue_guard::RequeueGuard;
//!
//! let mut guard = RequeueGuard::new(2);
//!
//! // Two markers left: four misses in a row mean two full rounds.
//! assert!(!guard.record_miss(2));
//! assert!(!guard.record_miss(2));
//! assert!(!guard.record_miss(2));
//! assert!(guard.record_miss(2));
//!
//! // A successful grasp starts over.
//! guard.reset();
//! assert!(!guard.record_miss(2));
//! ```

#[derive(Debug, Clone)]
pub struct RequeueGuard {
    /// Full passes over the queue tolerated without progress.
    rounds: usize,
    /// Misses since the last successful grasp.
    misses: usize,
}

impl RequeueGuard {
    /// `rounds` below 1 is treated as 1.
    pub fn new(rounds: usize) -> Self {
        Self {
            rounds: rounds.max(1),
            misses: 0,
        }
    }

    /// Record an unreachable marker.  `queue_len` is the number of markers
    /// still waiting to be collected.
    ///
    /// Returns `true` when the sequencer should give up.
    pub fn record_miss(&mut self, queue_len: usize) -> bool {
        self.misses += 1;
        self.is_stalled(queue_len)
    }

    pub fn is_stalled(&self, queue_len: usize) -> bool {
        self.misses >= self.rounds * queue_len.max(1)
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Forget all misses; called whenever an object is grasped.
    pub fn reset(&mut self) {
        self.misses = 0;
    }
}
