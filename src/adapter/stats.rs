//! Memory Adapter Statistics
//!
//! Counters kept by the memory adapter: hits, misses, evictions and sweeps.

use serde::Serialize;

// == Memory Stats ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    /// Requested keys found and not expired
    pub hits: u64,
    /// Requested keys missing or expired
    pub misses: u64,
    /// Entries dropped to make room for a write
    pub evictions: u64,
    /// Completed sweeps
    pub sweeps: u64,
    /// Entries removed by sweeps
    pub expired_removed: u64,
    /// Current number of entries, all namespaces included
    pub total_entries: usize,
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no keyed reads happened.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_sweep(&mut self, removed: usize) {
        self.sweeps += 1;
        self.expired_removed += removed as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
