//! Memory Adapter Module
//!
//! In-process backend: HashMap storage with LRU eviction when a write would
//! overflow the size limit, and expiration sweeps.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::adapter::{
    Adapter, ItemPayload, LruTracker, MemoryStats, StorageDeleter, StoredItem,
    MEMORY_ADAPTER_NAME,
};
use crate::collaborators::{Clock, SystemClock};
use crate::config::AdapterConfig;
use crate::error::{Result, StorageError};

#[derive(Debug)]
struct MemoryEntry {
    item: StoredItem,
    size: usize,
}

// == Memory State ==
/// Backend shared by every handle attached to it.
#[derive(Debug)]
struct MemoryState {
    entries: HashMap<String, MemoryEntry>,
    lru: LruTracker,
    stats: MemoryStats,
    /// Sum of entry sizes
    used: usize,
    max_size: usize,
}

impl MemoryState {
    fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: MemoryStats::new(),
            used: 0,
            max_size,
        }
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.used -= entry.size;
                self.lru.remove(key);
                true
            }
            None => false,
        }
    }

    fn remove_where(&mut self, mut predicate: impl FnMut(&str, &MemoryEntry) -> bool) -> usize {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, entry)| predicate(key.as_str(), *entry))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            self.remove_entry(key);
        }
        doomed.len()
    }

    fn wipe(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.used = 0;
    }

    fn sync_stats(&mut self) {
        let count = self.entries.len();
        self.stats.set_total_entries(count);
    }
}

// == Memory Adapter ==
/// In-memory adapter. Clones and [`MemoryAdapter::attach`]ed handles share
/// one backend, so several storages can sit on the same physical store.
#[derive(Clone)]
pub struct MemoryAdapter {
    state: Arc<Mutex<MemoryState>>,
    /// Namespace this handle clears
    key_prefix: String,
    clock: Arc<dyn Clock>,
}

impl MemoryAdapter {
    // == Constructor ==
    /// Creates a fresh backend sized and namespaced by `config`.
    pub fn new(config: &AdapterConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a fresh backend reading time from `clock`.
    pub fn with_clock(config: &AdapterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::new(config.max_size))),
            key_prefix: config.key_prefix.clone(),
            clock,
        }
    }

    // == Attach ==
    /// Opens another handle on this backend under `config`'s key prefix.
    ///
    /// With `clear_on_init` set, entries under that prefix are dropped
    /// immediately. The backend keeps its original size limit.
    pub fn attach(&self, config: &AdapterConfig) -> Self {
        let handle = Self {
            state: Arc::clone(&self.state),
            key_prefix: config.key_prefix.clone(),
            clock: Arc::clone(&self.clock),
        };
        if config.clear_on_init {
            handle.clear_namespace();
        }
        handle
    }

    /// Snapshot of the backend counters.
    pub fn stats(&self) -> MemoryStats {
        let mut state = self.lock();
        state.sync_stats();
        state.stats.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn clear_namespace(&self) {
        let mut state = self.lock();
        if self.key_prefix.is_empty() {
            state.wipe();
        } else {
            let prefix = self.key_prefix.as_str();
            state.remove_where(|key, _| key.starts_with(prefix));
        }
        state.sync_stats();
    }
}

impl std::fmt::Debug for MemoryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAdapter")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn name(&self) -> &str {
        MEMORY_ADAPTER_NAME
    }

    async fn size(&self) -> Result<usize> {
        Ok(self.lock().used)
    }

    // == Get Items ==
    async fn get_items(
        &self,
        keys: Option<&[String]>,
        include_expired: bool,
    ) -> Result<HashMap<String, StoredItem>> {
        let now = self.clock.now_ms();
        let mut guard = self.lock();
        let state = &mut *guard;
        let visible = |entry: &MemoryEntry| include_expired || !entry.item.is_expired_at(now);

        let Some(keys) = keys else {
            return Ok(state
                .entries
                .iter()
                .filter(|(_, entry)| visible(*entry))
                .map(|(key, entry)| (key.clone(), entry.item.clone()))
                .collect());
        };

        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            match state.entries.get(key) {
                Some(entry) if visible(entry) => {
                    found.insert(key.clone(), entry.item.clone());
                }
                _ => state.stats.record_miss(),
            }
        }
        for key in found.keys() {
            state.lru.touch(key);
            state.stats.record_hit();
        }
        Ok(found)
    }

    // == Set Items ==
    /// Stores the batch, evicting least recently used entries (expired ones
    /// first) when it would not fit otherwise. Entries being written are
    /// never picked as victims. Nothing changes if the batch cannot fit.
    async fn set_items(&self, payloads: Vec<ItemPayload>) -> Result<()> {
        let now = self.clock.now_ms();
        let mut guard = self.lock();
        let state = &mut *guard;

        let incoming: usize = payloads.iter().map(|p| p.size).sum();
        if incoming > state.max_size {
            return Err(StorageError::SizeExceeded {
                key: format!("batch of {} items", payloads.len()),
                size: incoming,
                max_size: state.max_size,
            });
        }

        let batch: HashSet<&str> = payloads.iter().map(|p| p.key.as_str()).collect();
        let replaced: usize = batch
            .iter()
            .filter_map(|key| state.entries.get(*key))
            .map(|entry| entry.size)
            .sum();
        let mut projected = state.used.saturating_sub(replaced) + incoming;

        let mut victims = Vec::new();
        if projected > state.max_size {
            let (expired, live): (Vec<&String>, Vec<&String>) = state
                .lru
                .oldest_first()
                .filter(|key| !batch.contains(key.as_str()))
                .partition(|key| {
                    state
                        .entries
                        .get(key.as_str())
                        .map_or(true, |entry| entry.item.is_expired_at(now))
                });

            for key in expired.into_iter().chain(live) {
                if projected <= state.max_size {
                    break;
                }
                if let Some(entry) = state.entries.get(key.as_str()) {
                    projected -= entry.size;
                    victims.push(key.clone());
                }
            }
        }
        if projected > state.max_size {
            return Err(StorageError::adapter(format!(
                "memory adapter cannot make room for {} bytes",
                incoming
            )));
        }

        for victim in &victims {
            state.remove_entry(victim);
            state.stats.record_eviction();
        }
        if !victims.is_empty() {
            debug!(evicted = victims.len(), "memory adapter evicted entries to fit write");
        }

        for payload in payloads {
            state.remove_entry(&payload.key);
            state.used += payload.size;
            state.lru.touch(&payload.key);
            state.entries.insert(
                payload.key,
                MemoryEntry {
                    item: payload.item,
                    size: payload.size,
                },
            );
        }
        state.sync_stats();
        Ok(())
    }

    async fn remove_items(&self, keys: &[String]) -> Result<()> {
        let mut state = self.lock();
        for key in keys {
            state.remove_entry(key);
        }
        state.sync_stats();
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.clear_namespace();
        Ok(())
    }

    // == Sweep ==
    async fn sweep(&self) -> Result<()> {
        let now = self.clock.now_ms();
        let mut state = self.lock();
        let removed = state.remove_where(|_, entry| entry.item.is_expired_at(now));
        state.stats.record_sweep(removed);
        state.sync_stats();
        debug!(removed, "memory adapter sweep complete");
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn is_secure(&self) -> bool {
        true
    }

    fn storage_deleter(&self) -> Option<&dyn StorageDeleter> {
        Some(self)
    }
}

#[async_trait]
impl StorageDeleter for MemoryAdapter {
    async fn delete_storage(&self) -> Result<()> {
        let mut state = self.lock();
        state.wipe();
        state.sync_stats();
        Ok(())
    }
}
