//! Client Cache - namespaced client-side storage service
//!
//! Provides an isolated, size-bounded key-value store with expiration and
//! throttled background sweeps over pluggable persistence adapters.

pub mod adapter;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod service;
pub mod tasks;

pub use adapter::{Adapter, MemoryAdapter};
pub use collaborators::Collaborators;
pub use config::{AdapterConfig, StorageConfig};
pub use error::{Result, StorageError};
pub use service::{StorageService, SweepHandle, SweepStatus};
pub use tasks::spawn_sweep_task;
