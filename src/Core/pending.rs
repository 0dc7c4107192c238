use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of messages posted but not yet delivered or discarded.
///
/// Every poster bumps it and the message thread drops it again, so the
/// counter lives on its own cache line to keep posters from false-sharing
/// with the manager's flags.
#[derive(Default)]
pub struct PendingCount {
    count: CachePadded<AtomicUsize>,
}

impl PendingCount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly posted message. Returns the count after the increment.
    #[inline]
    pub fn increment(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Records a delivered or discarded message. Returns the count after the
    /// decrement. The counter never wraps below zero.
    #[inline]
    pub fn decrement(&self) -> usize {
        let previous = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match previous {
            Ok(n) => n - 1,
            Err(_) => {
                debug_assert!(false, "pending count decremented below zero");
                log::error!("pending count decremented below zero");
                0
            }
        }
    }

    #[inline]
    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.get() == 0
    }
}

impl std::fmt::Debug for PendingCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PendingCount").field(&self.get()).finish()
    }
}
