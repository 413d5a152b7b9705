//! Adapter Module
//!
//! The contract persistence backends implement, plus the in-process
//! reference backend.

mod item;
mod lru;
mod memory;
mod stats;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

// Re-export public types
pub use item::{ItemPayload, StoredItem};
pub use lru::LruTracker;
pub use memory::MemoryAdapter;
pub use stats::MemoryStats;

/// Name reported by [`MemoryAdapter`].
pub const MEMORY_ADAPTER_NAME: &str = "memory";

// == Adapter ==
/// Raw storage of namespaced items.
///
/// Keys handed to an adapter are already namespaced. Adapters never see
/// user keys, and may hold entries belonging to several namespaces.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Short backend name used in logs and telemetry.
    fn name(&self) -> &str;

    /// Total stored bytes.
    async fn size(&self) -> Result<usize>;

    /// Fetches items by namespaced key, or every item when `keys` is `None`.
    ///
    /// Missing keys are simply absent from the result. Expired items are
    /// included only when `include_expired` is set.
    async fn get_items(
        &self,
        keys: Option<&[String]>,
        include_expired: bool,
    ) -> Result<HashMap<String, StoredItem>>;

    /// Stores a batch. Either every payload is stored or none is.
    async fn set_items(&self, payloads: Vec<ItemPayload>) -> Result<()>;

    async fn remove_items(&self, keys: &[String]) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    /// Removes expired items.
    async fn sweep(&self) -> Result<()>;

    fn is_persistent(&self) -> bool;

    fn is_secure(&self) -> bool;

    /// Optional capability: permanently delete the backing storage.
    fn storage_deleter(&self) -> Option<&dyn StorageDeleter> {
        None
    }

    /// Optional capability: hooks notified when sweeping is suspended or resumed.
    fn sweep_control(&self) -> Option<&dyn SweepControl> {
        None
    }
}

/// Adapters able to destroy their backing storage.
#[async_trait]
pub trait StorageDeleter: Send + Sync {
    async fn delete_storage(&self) -> Result<()>;
}

/// Adapters running their own expiration machinery that must pause with the service.
pub trait SweepControl: Send + Sync {
    fn suspend_sweeping(&self);
    fn resume_sweeping(&self);
}
