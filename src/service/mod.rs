//! Service Module
//!
//! The storage service: key namespacing, size-bounded writes, in-flight
//! accounting and sweep scheduling over an [`Adapter`](crate::adapter::Adapter).

mod in_flight;
mod keys;
mod storage;
mod sweep;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use storage::StorageService;
pub use sweep::{
    sweep_interval_for, SweepHandle, SweepStatus, SWEEP_INTERVAL_MAX, SWEEP_INTERVAL_MIN,
};
