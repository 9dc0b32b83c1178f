//! Dispatch counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of dispatch counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchStats {
    /// Commands appended to the queue
    pub enqueued: u64,
    /// Commands refused because the queue was asleep
    pub rejected: u64,
    /// Commands handed to the channel
    pub delivered: u64,
    /// Commands popped while the channel was not deliverable
    pub dropped: u64,
    /// Commands the channel reported as executed
    pub acknowledged: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub enqueued: AtomicU64,
    pub rejected: AtomicU64,
    pub delivered: AtomicU64,
    pub dropped: AtomicU64,
    pub acknowledged: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            acknowledged: self.acknowledged.load(Ordering::Relaxed),
        }
    }
}
