//! Host readiness gate for sweeping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Answers whether the hosting system has finished initializing.
pub trait ReadinessQuery: Send + Sync {
    fn is_ready(&self) -> bool;
}

/// Shared boolean flag. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct ReadinessFlag {
    ready: Arc<AtomicBool>,
}

impl ReadinessFlag {
    pub fn ready() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag that stays closed until [`ReadinessFlag::mark_ready`].
    pub fn pending() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }
}

impl ReadinessQuery for ReadinessFlag {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
