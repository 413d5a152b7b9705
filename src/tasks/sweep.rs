//! Periodic Sweep Task
//!
//! Background task that keeps asking a storage to sweep expired entries.
//! Each request goes through the service's normal guards, so a tick that
//! lands inside the sweep interval, while suspended, or before the host is
//! ready does nothing.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::service::{StorageService, SweepStatus};

/// Spawns a background task that requests a sweep every `interval`.
///
/// # Arguments
/// * `service` - Storage to sweep
/// * `interval` - Time between two requests
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_sweep_task(service.clone(), service.auto_refresh_interval());
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task(service: StorageService, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            storage = service.name(),
            "Starting sweep task with interval of {}ms",
            interval.as_millis()
        );

        loop {
            tokio::time::sleep(interval).await;

            if service.sweep_status() == SweepStatus::Suspended {
                debug!(storage = service.name(), "Sweep task: sweeping suspended");
                continue;
            }
            service.sweep(false).await;
            debug!(
                storage = service.name(),
                in_flight = service.operations_in_flight(),
                "Sweep task: tick complete"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::adapter::MemoryAdapter;
    use crate::collaborators::{Collaborators, ManualClock};
    use crate::config::StorageConfig;

    fn memory_service(clock: &ManualClock) -> (StorageService, MemoryAdapter) {
        let config = StorageConfig::new("swept").with_expiration(1);
        let adapter = MemoryAdapter::with_clock(&config.adapter_config(), Arc::new(clock.clone()));
        let backend = adapter.clone();
        let collab = Collaborators::default().with_clock(Arc::new(clock.clone()));
        let service = StorageService::new(config, move |_| Arc::new(backend), collab).unwrap();
        (service, adapter)
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let clock = ManualClock::new(0);
        let (service, adapter) = memory_service(&clock);
        service.set("expire_soon", json!("value")).await.unwrap();

        // Past both the item lifetime and the sweep interval
        clock.advance(Duration::from_secs(61));
        let handle = spawn_sweep_task(service.clone(), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(adapter.is_empty(), "Expired entry should have been swept");
        assert_eq!(adapter.stats().sweeps, 1, "Interval guard allows one sweep");
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_respects_suspension() {
        let clock = ManualClock::new(0);
        let (service, adapter) = memory_service(&clock);
        service.set("kept", json!("value")).await.unwrap();
        service.suspend_sweeping();

        clock.advance(Duration::from_secs(61));
        let handle = spawn_sweep_task(service.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(adapter.stats().sweeps, 0);
        assert_eq!(adapter.len(), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let clock = ManualClock::new(0);
        let (service, _) = memory_service(&clock);

        let handle = spawn_sweep_task(service, Duration::from_secs(1));
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
