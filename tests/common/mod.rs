//! Shared helpers for storage service integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{broadcast, Notify};

use client_cache::adapter::{ItemPayload, StorageDeleter, StoredItem, SweepControl};
use client_cache::collaborators::{
    BroadcastEmitter, Collaborators, ManualClock, MetricsSink, ReadinessFlag, StorageEvent,
    TelemetryRecord,
};
use client_cache::{
    Adapter, AdapterConfig, MemoryAdapter, Result, StorageConfig, StorageError, StorageService,
};

/// Epoch the manual clock starts at.
pub const START_MS: i64 = 1_700_000_000_000;

// == Probe Adapter ==
/// Memory-backed adapter that counts calls, fails on demand and can hold
/// sweeps pending. Exposes sweep hooks, and storage deletion once
/// [`ProbeAdapter::allow_deletion`] is called.
pub struct ProbeAdapter {
    inner: MemoryAdapter,
    pub get_calls: AtomicUsize,
    pub set_calls: AtomicUsize,
    pub sweep_calls: AtomicUsize,
    pub suspend_calls: AtomicUsize,
    pub resume_calls: AtomicUsize,
    failing: Mutex<Vec<&'static str>>,
    deletable: AtomicBool,
    sweep_gate: Mutex<Option<Arc<Notify>>>,
}

impl ProbeAdapter {
    pub fn new(config: &AdapterConfig, clock: &ManualClock) -> Self {
        Self {
            inner: MemoryAdapter::with_clock(config, Arc::new(clock.clone())),
            get_calls: AtomicUsize::new(0),
            set_calls: AtomicUsize::new(0),
            sweep_calls: AtomicUsize::new(0),
            suspend_calls: AtomicUsize::new(0),
            resume_calls: AtomicUsize::new(0),
            failing: Mutex::new(Vec::new()),
            deletable: AtomicBool::new(false),
            sweep_gate: Mutex::new(None),
        }
    }

    /// Makes every later call of `operation` fail.
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().push(operation);
    }

    /// Exposes the storage deletion capability.
    pub fn allow_deletion(&self) {
        self.deletable.store(true, Ordering::SeqCst);
    }

    /// Holds sweeps until the returned notifier fires.
    pub fn hold_sweeps(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.sweep_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.failing.lock().unwrap().contains(&operation) {
            return Err(StorageError::adapter(format!("injected {} failure", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl Adapter for ProbeAdapter {
    fn name(&self) -> &str {
        "probe"
    }

    async fn size(&self) -> Result<usize> {
        self.check("size")?;
        self.inner.size().await
    }

    async fn get_items(
        &self,
        keys: Option<&[String]>,
        include_expired: bool,
    ) -> Result<HashMap<String, StoredItem>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check("get")?;
        self.inner.get_items(keys, include_expired).await
    }

    async fn set_items(&self, payloads: Vec<ItemPayload>) -> Result<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.check("set")?;
        self.inner.set_items(payloads).await
    }

    async fn remove_items(&self, keys: &[String]) -> Result<()> {
        self.check("remove")?;
        self.inner.remove_items(keys).await
    }

    async fn clear(&self) -> Result<()> {
        self.check("clear")?;
        self.inner.clear().await
    }

    async fn sweep(&self) -> Result<()> {
        self.sweep_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.sweep_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check("sweep")?;
        self.inner.sweep().await
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn is_secure(&self) -> bool {
        false
    }

    fn storage_deleter(&self) -> Option<&dyn StorageDeleter> {
        if self.deletable.load(Ordering::SeqCst) {
            Some(self)
        } else {
            None
        }
    }

    fn sweep_control(&self) -> Option<&dyn SweepControl> {
        Some(self)
    }
}

#[async_trait]
impl StorageDeleter for ProbeAdapter {
    async fn delete_storage(&self) -> Result<()> {
        self.check("deleteStorage")?;
        StorageDeleter::delete_storage(&self.inner).await
    }
}

impl SweepControl for ProbeAdapter {
    fn suspend_sweeping(&self) {
        self.suspend_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn resume_sweeping(&self) {
        self.resume_calls.fetch_add(1, Ordering::SeqCst);
    }
}

// == Recording Metrics ==
#[derive(Default)]
pub struct RecordingMetrics {
    pub records: Mutex<Vec<TelemetryRecord>>,
}

impl RecordingMetrics {
    pub fn operations(&self) -> Vec<&'static str> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.attributes.operation.as_str())
            .collect()
    }
}

impl MetricsSink for RecordingMetrics {
    fn record(&self, record: TelemetryRecord) {
        self.records.lock().unwrap().push(record);
    }
}

// == Harness ==
pub struct Harness {
    pub service: StorageService,
    pub probe: Arc<ProbeAdapter>,
    pub clock: ManualClock,
    pub metrics: Arc<RecordingMetrics>,
    pub readiness: ReadinessFlag,
    pub events: broadcast::Receiver<StorageEvent>,
}

impl Harness {
    pub fn new(config: StorageConfig) -> Self {
        Self::with_readiness(config, ReadinessFlag::ready())
    }

    pub fn with_readiness(config: StorageConfig, readiness: ReadinessFlag) -> Self {
        let clock = ManualClock::new(START_MS);
        let probe = Arc::new(ProbeAdapter::new(&config.adapter_config(), &clock));
        let metrics = Arc::new(RecordingMetrics::default());
        let emitter = BroadcastEmitter::new(64);
        let events = emitter.subscribe();

        let collab = Collaborators::default()
            .with_clock(Arc::new(clock.clone()))
            .with_metrics(metrics.clone())
            .with_readiness(Arc::new(readiness.clone()))
            .with_events(Arc::new(emitter));
        let adapter: Arc<dyn Adapter> = probe.clone();
        let service = StorageService::new(config, move |_| adapter, collab).unwrap();

        Self {
            service,
            probe,
            clock,
            metrics,
            readiness,
            events,
        }
    }

    pub fn sweeps(&self) -> usize {
        ProbeAdapter::count(&self.probe.sweep_calls)
    }

    /// Number of modification events fired so far and not yet drained.
    pub fn drain_events(&mut self) -> usize {
        let mut count = 0;
        while self.events.try_recv().is_ok() {
            count += 1;
        }
        count
    }
}
