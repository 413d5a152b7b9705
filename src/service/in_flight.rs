//! In-flight operation accounting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counter of adapter operations that have not settled yet.
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
    count: Arc<AtomicUsize>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Counts one operation until the returned guard drops.
    pub(crate) fn acquire(&self) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            count: Arc::clone(&self.count),
        }
    }

    pub(crate) fn current(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Releases its slot exactly once, on whatever path drops it.
#[derive(Debug)]
#[must_use = "the operation stops being counted as soon as the guard drops"]
pub(crate) struct InFlightGuard {
    count: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}
