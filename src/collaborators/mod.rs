//! Collaborators Module
//!
//! Host-side services the storage service depends on, injected at
//! construction: logging, telemetry, readiness, events, size estimation
//! and time.

mod clock;
mod events;
mod logging;
mod readiness;
mod size;

use std::sync::Arc;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{BroadcastEmitter, EventEmitter, StorageEvent, MODIFIED_EVENT};
pub use logging::{
    ErrorAttributes, Logger, MetricsSink, Operation, TelemetryRecord, TracingLogger,
    TracingMetrics, STORAGE_ERROR_CATEGORY,
};
pub use readiness::{ReadinessFlag, ReadinessQuery};
pub use size::{JsonSizeEstimator, SizeEstimator};

// == Collaborators ==
/// Bundle of injected host services.
///
/// `Default` wires tracing-backed logging and telemetry, an always-ready
/// readiness flag, a broadcast emitter nobody listens to, the JSON size
/// estimator and the system clock.
#[derive(Clone)]
pub struct Collaborators {
    pub logger: Arc<dyn Logger>,
    pub metrics: Arc<dyn MetricsSink>,
    pub readiness: Arc<dyn ReadinessQuery>,
    pub events: Arc<dyn EventEmitter>,
    pub size_estimator: Arc<dyn SizeEstimator>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_readiness(mut self, readiness: Arc<dyn ReadinessQuery>) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventEmitter>) -> Self {
        self.events = events;
        self
    }

    pub fn with_size_estimator(mut self, size_estimator: Arc<dyn SizeEstimator>) -> Self {
        self.size_estimator = size_estimator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            logger: Arc::new(TracingLogger),
            metrics: Arc::new(TracingMetrics),
            readiness: Arc::new(ReadinessFlag::ready()),
            events: Arc::new(BroadcastEmitter::default()),
            size_estimator: Arc::new(JsonSizeEstimator),
            clock: Arc::new(SystemClock),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("ready", &self.readiness.is_ready())
            .field("now_ms", &self.clock.now_ms())
            .finish_non_exhaustive()
    }
}
