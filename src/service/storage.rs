//! Storage Service Module
//!
//! Namespaced, size-bounded async key-value storage over a pluggable adapter,
//! with throttled background sweeps.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::FutureExt;
use serde_json::Value;
use tokio::runtime::Handle;

use crate::adapter::{Adapter, MemoryAdapter};
use crate::collaborators::{
    Collaborators, ErrorAttributes, Operation, StorageEvent, TelemetryRecord,
    STORAGE_ERROR_CATEGORY,
};
use crate::config::{AdapterConfig, StorageConfig};
use crate::error::{Result, StorageError};
use crate::service::in_flight::InFlight;
use crate::service::keys::{validate_key, validate_keys, KeyNamespace, PayloadBuilder};
use crate::service::sweep::{
    completed_handle, sweep_interval_for, SweepDecision, SweepHandle, SweepPhase, SweepState,
    SweepStatus,
};

// == Storage Service ==
/// Client-side storage area backed by one adapter.
///
/// Cloning is cheap; clones share the adapter, counters and sweep state.
#[derive(Clone)]
pub struct StorageService {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    version: String,
    namespace: KeyNamespace,
    /// Bytes
    max_size: usize,
    expiration: Duration,
    auto_refresh_interval: Duration,
    sweep_interval: Duration,
    debug_logging: bool,
    adapter: Arc<dyn Adapter>,
    in_flight: InFlight,
    sweep: Mutex<SweepState>,
    collab: Collaborators,
}

impl StorageService {
    // == Constructor ==
    /// Creates the service and its adapter.
    ///
    /// The key prefix is derived from `config` first and handed to `factory`
    /// inside the [`AdapterConfig`].
    ///
    /// # Errors
    /// `InvalidArgument` when the storage name is empty.
    pub fn new<F>(config: StorageConfig, factory: F, collaborators: Collaborators) -> Result<Self>
    where
        F: FnOnce(&AdapterConfig) -> Arc<dyn Adapter>,
    {
        if config.name.is_empty() {
            return Err(StorageError::InvalidArgument(
                "storage name must not be empty".to_string(),
            ));
        }

        let adapter_config = config.adapter_config();
        let adapter = factory(&adapter_config);

        let expiration = Duration::from_secs(config.expiration);
        let now = collaborators.clock.now_ms();
        let service = Self {
            inner: Arc::new(Inner {
                name: config.name,
                version: config.version,
                namespace: KeyNamespace::new(adapter_config.key_prefix),
                max_size: config.max_size,
                expiration,
                auto_refresh_interval: Duration::from_secs(config.auto_refresh_interval),
                sweep_interval: sweep_interval_for(expiration),
                debug_logging: config.debug_logging,
                adapter,
                in_flight: InFlight::new(),
                sweep: Mutex::new(SweepState::new(now)),
                collab: collaborators,
            }),
        };

        let inner = &service.inner;
        inner.log(&format!(
            "initialized - maxSize: {}KB, expiration: {}s, autoRefreshInterval: {}s, \
             sweepInterval: {}s, persistent: {}, secure: {}, keyPrefix: '{}'",
            inner.max_size / 1024,
            inner.expiration.as_secs(),
            inner.auto_refresh_interval.as_secs(),
            inner.sweep_interval.as_secs(),
            inner.adapter.is_persistent(),
            inner.adapter.is_secure(),
            inner.namespace.prefix()
        ));
        Ok(service)
    }

    /// Creates a service over a fresh [`MemoryAdapter`] sharing the
    /// collaborators' clock.
    pub fn memory(config: StorageConfig, collaborators: Collaborators) -> Result<Self> {
        let clock = Arc::clone(&collaborators.clock);
        Self::new(
            config,
            |adapter_config| Arc::new(MemoryAdapter::with_clock(adapter_config, clock)),
            collaborators,
        )
    }

    // == Get ==
    /// Returns the value stored under `key`, or `None` when it is missing
    /// (or expired, unless `include_expired`).
    pub async fn get(&self, key: &str, include_expired: bool) -> Result<Option<Value>> {
        validate_key(key)?;
        let keys = [key.to_string()];
        let mut found = self.get_all(Some(&keys), include_expired).await?;
        Ok(found.remove(key))
    }

    // == Get All ==
    /// Returns the requested entries keyed by user key.
    ///
    /// `None` or an empty slice fetches every entry of this storage's
    /// namespace. Entries of other namespaces sharing the backend are never
    /// returned.
    pub async fn get_all(
        &self,
        keys: Option<&[String]>,
        include_expired: bool,
    ) -> Result<HashMap<String, Value>> {
        let inner = &self.inner;
        let requested = keys.filter(|keys| !keys.is_empty());
        if let Some(keys) = requested {
            validate_keys(keys)?;
        }
        let namespaced = requested.map(|keys| inner.namespace.apply_all(keys));

        let outcome = {
            let _guard = inner.in_flight.acquire();
            inner
                .adapter
                .get_items(namespaced.as_deref(), include_expired)
                .await
        };
        let items = outcome.map_err(|err| inner.report(Operation::GetAll, err))?;

        let now = inner.collab.clock.now_ms();
        let results: HashMap<String, Value> = items
            .into_iter()
            .filter(|(_, item)| include_expired || !item.is_expired_at(now))
            .filter_map(|(key, item)| {
                inner
                    .namespace
                    .strip(&key)
                    .map(|user_key| (user_key.to_string(), item.value))
            })
            .collect();

        if inner.debug_logging {
            if let Some(keys) = requested {
                let (hits, misses): (Vec<&String>, Vec<&String>) =
                    keys.iter().partition(|key| results.contains_key(key.as_str()));
                if !hits.is_empty() {
                    inner.log(&format!("getAll() - hits: {:?}", hits));
                }
                if !misses.is_empty() {
                    inner.log(&format!("getAll() - misses: {:?}", misses));
                }
            }
        }
        Ok(results)
    }

    // == Set ==
    pub async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.set_all(vec![(key.to_string(), value)]).await
    }

    // == Set All ==
    /// Stores every value or none of them.
    ///
    /// Fails with `SizeExceeded`, before touching the adapter, when one
    /// value or the whole batch is over the storage's max size. Starting
    /// the write also kicks off a throttled sweep, which is not awaited.
    pub async fn set_all(&self, values: Vec<(String, Value)>) -> Result<()> {
        let inner = &self.inner;
        let builder = PayloadBuilder {
            namespace: &inner.namespace,
            estimator: inner.collab.size_estimator.as_ref(),
            now_ms: inner.collab.clock.now_ms(),
            expiration: inner.expiration,
            max_size: inner.max_size,
        };
        let batch = match builder.build(values) {
            Ok(batch) => batch,
            Err(err @ StorageError::SizeExceeded { .. }) => {
                return Err(inner.report(Operation::Set, err));
            }
            Err(err) => return Err(err),
        };

        let outcome = {
            let _guard = inner.in_flight.acquire();
            let write = inner.adapter.set_items(batch.payloads);
            let _ = self.sweep(false);
            write.await
        };
        outcome.map_err(|err| inner.report(Operation::Set, err))?;

        inner.log(&format!(
            "set() - {} keys ({} bytes): {:?}",
            batch.keys.len(),
            batch.total_size,
            batch.keys
        ));
        inner.fire_modified();
        Ok(())
    }

    // == Remove ==
    pub async fn remove(&self, key: &str, do_not_fire_modified: bool) -> Result<()> {
        validate_key(key)?;
        self.remove_all(&[key.to_string()], do_not_fire_modified).await
    }

    // == Remove All ==
    /// Removes the given keys. Keys that are not stored are ignored.
    pub async fn remove_all(&self, keys: &[String], do_not_fire_modified: bool) -> Result<()> {
        let inner = &self.inner;
        validate_keys(keys)?;
        let namespaced = inner.namespace.apply_all(keys);

        let outcome = {
            let _guard = inner.in_flight.acquire();
            inner.adapter.remove_items(&namespaced).await
        };
        outcome.map_err(|err| inner.report(Operation::Remove, err))?;

        if inner.debug_logging {
            for key in keys {
                inner.log(&format!("remove() - key: {}", key));
            }
        }
        if !do_not_fire_modified {
            inner.fire_modified();
        }
        Ok(())
    }

    // == Clear ==
    pub async fn clear(&self) -> Result<()> {
        let inner = &self.inner;
        let outcome = {
            let _guard = inner.in_flight.acquire();
            inner.adapter.clear().await
        };
        outcome.map_err(|err| inner.report(Operation::Clear, err))?;

        inner.log("clear() - complete");
        inner.fire_modified();
        Ok(())
    }

    // == Sweep ==
    /// Requests a sweep of expired entries.
    ///
    /// While a sweep is pending this returns a clone of its handle.
    /// Otherwise the request resolves immediately without touching the
    /// adapter when sweeping is suspended, the host is not ready, or
    /// (unless `ignore_interval`) the sweep interval has not elapsed since
    /// the last sweep.
    ///
    /// A started sweep is spawned on the current tokio runtime. Outside a
    /// runtime no sweep starts and the state is left untouched. Adapter
    /// failures are reported to telemetry and never surface here.
    pub fn sweep(&self, ignore_interval: bool) -> SweepHandle {
        let inner = &self.inner;
        let now = inner.collab.clock.now_ms();
        let ready = inner.collab.readiness.is_ready();

        let mut state = inner.lock_sweep();
        let decision = state.decide(now, inner.sweep_interval, ready, ignore_interval);
        match decision {
            SweepDecision::Join(handle) => return handle,
            SweepDecision::Skip(reason) => {
                drop(state);
                inner.log(&format!("sweep() - skipped: {}", reason));
                return completed_handle();
            }
            SweepDecision::Start => {}
        }
        let Ok(runtime) = Handle::try_current() else {
            drop(state);
            inner.log("sweep() - skipped: no runtime");
            return completed_handle();
        };

        let guard = inner.in_flight.acquire();
        let task = Arc::clone(&self.inner);
        let handle = async move {
            let outcome = task.adapter.sweep().await;
            drop(guard);
            task.finish_sweep(outcome);
        }
        .boxed()
        .shared();
        state.phase = SweepPhase::Sweeping(handle.clone());
        drop(state);

        inner.log("sweep() - starting");
        runtime.spawn(handle.clone());
        handle
    }

    /// Stops sweeps from starting until [`StorageService::resume_sweeping`].
    pub fn suspend_sweeping(&self) {
        let inner = &self.inner;
        inner.lock_sweep().suspended = true;
        if let Some(control) = inner.adapter.sweep_control() {
            control.suspend_sweeping();
        }
        inner.log("suspendSweeping()");
    }

    /// Re-enables sweeping and immediately requests a sweep.
    pub fn resume_sweeping(&self) -> SweepHandle {
        let inner = &self.inner;
        inner.lock_sweep().suspended = false;
        if let Some(control) = inner.adapter.sweep_control() {
            control.resume_sweeping();
        }
        inner.log("resumeSweeping()");
        self.sweep(false)
    }

    pub fn sweep_status(&self) -> SweepStatus {
        self.inner.lock_sweep().status()
    }

    // == Delete Storage ==
    /// Permanently deletes the backing storage if the adapter can do so.
    ///
    /// The service must not be used afterwards.
    pub async fn delete_storage(&self) -> Result<()> {
        let inner = &self.inner;
        match inner.adapter.storage_deleter() {
            Some(deleter) => deleter
                .delete_storage()
                .await
                .map_err(|err| inner.report(Operation::DeleteStorage, err)),
            None => Ok(()),
        }
    }

    // == Accessors ==
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn version(&self) -> &str {
        &self.inner.version
    }

    pub fn key_prefix(&self) -> &str {
        self.inner.namespace.prefix()
    }

    pub fn adapter_name(&self) -> &str {
        self.inner.adapter.name()
    }

    /// Current adapter size in KB.
    pub async fn size(&self) -> Result<f64> {
        let inner = &self.inner;
        let bytes = inner
            .adapter
            .size()
            .await
            .map_err(|err| inner.report(Operation::GetSize, err))?;
        Ok(bytes as f64 / 1024.0)
    }

    /// Max size in KB.
    pub fn max_size(&self) -> f64 {
        self.inner.max_size as f64 / 1024.0
    }

    pub fn expiration(&self) -> Duration {
        self.inner.expiration
    }

    pub fn auto_refresh_interval(&self) -> Duration {
        self.inner.auto_refresh_interval
    }

    pub fn sweep_interval(&self) -> Duration {
        self.inner.sweep_interval
    }

    pub fn is_persistent(&self) -> bool {
        self.inner.adapter.is_persistent()
    }

    pub fn is_secure(&self) -> bool {
        self.inner.adapter.is_secure()
    }

    /// Adapter operations started by this service that have not settled.
    pub fn operations_in_flight(&self) -> usize {
        self.inner.in_flight.current()
    }
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("name", &self.inner.name)
            .field("adapter", &self.inner.adapter.name())
            .field("key_prefix", &self.inner.namespace.prefix())
            .field("operations_in_flight", &self.inner.in_flight.current())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn lock_sweep(&self) -> MutexGuard<'_, SweepState> {
        self.sweep.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_sweep(&self, outcome: Result<()>) {
        let failed = match outcome {
            Ok(()) => false,
            Err(err) => {
                self.report(Operation::Sweep, err);
                true
            }
        };
        self.log(if failed {
            "sweep() - complete (with errors)"
        } else {
            "sweep() - complete"
        });

        let now = self.collab.clock.now_ms();
        self.lock_sweep().finish(now);
        if !failed {
            self.fire_modified();
        }
    }

    // == Logging ==
    fn log(&self, message: &str) {
        if self.debug_logging {
            self.collab.logger.log(&format!(
                "{} '[{}]' : {}",
                self.name,
                self.adapter.name(),
                message
            ));
        }
    }

    /// Sends `err` to telemetry and hands it back unchanged.
    fn report(&self, operation: Operation, err: StorageError) -> StorageError {
        self.collab.metrics.record(TelemetryRecord {
            category: STORAGE_ERROR_CATEGORY,
            attributes: ErrorAttributes {
                name: self.name.clone(),
                adapter: self.adapter.name().to_string(),
                operation,
                error: err.to_string(),
            },
        });
        err
    }

    fn fire_modified(&self) {
        self.collab.events.fire(StorageEvent::modified(self.name.clone()));
    }
}
