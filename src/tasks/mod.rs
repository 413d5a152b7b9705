//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a storage.
//!
//! # Tasks
//! - Sweep: requests an expiration sweep at a fixed interval

mod sweep;

pub use sweep::spawn_sweep_task;
