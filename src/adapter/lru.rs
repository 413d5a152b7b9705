//! LRU Tracker Module
//!
//! Access-order bookkeeping used by the memory adapter to pick eviction
//! victims when a write would overflow the size limit.

use std::collections::VecDeque;

// == LRU Tracker ==
/// Tracks key access order.
///
/// Keys are stored in a VecDeque where:
/// - Front = Most recently used
/// - Back = Least recently used
#[derive(Debug, Default)]
pub struct LruTracker {
    order: VecDeque<String>,
}

impl LruTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, adding it if unknown.
    pub fn touch(&mut self, key: &str) {
        self.remove(key);
        self.order.push_front(key.to_string());
    }

    pub fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    // == Oldest First ==
    /// Iterates keys from least to most recently used.
    pub fn oldest_first(&self) -> impl Iterator<Item = &String> {
        self.order.iter().rev()
    }
}
