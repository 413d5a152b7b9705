//! Debug logging and error telemetry sinks.

use serde::Serialize;
use tracing::{debug, error};

/// Category under which storage failures are reported.
pub const STORAGE_ERROR_CATEGORY: &str = "performance:clientStorage";

/// Sink for debug log lines.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

/// Forwards log lines to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        debug!(target: "client_cache", "{}", message);
    }
}

// == Operation ==
/// Storage operation named in telemetry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    #[serde(rename = "getAll")]
    GetAll,
    #[serde(rename = "set")]
    Set,
    #[serde(rename = "remove")]
    Remove,
    #[serde(rename = "clear")]
    Clear,
    #[serde(rename = "sweep")]
    Sweep,
    #[serde(rename = "getSize")]
    GetSize,
    #[serde(rename = "deleteStorage")]
    DeleteStorage,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetAll => "getAll",
            Operation::Set => "set",
            Operation::Remove => "remove",
            Operation::Clear => "clear",
            Operation::Sweep => "sweep",
            Operation::GetSize => "getSize",
            Operation::DeleteStorage => "deleteStorage",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Telemetry Record ==
/// Structured failure report handed to the metrics sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryRecord {
    pub category: &'static str,
    pub attributes: ErrorAttributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorAttributes {
    /// Storage name
    pub name: String,
    /// Adapter name
    pub adapter: String,
    pub operation: Operation,
    /// Rendered error
    pub error: String,
}

/// Receives failure reports. Implementations must not fail.
pub trait MetricsSink: Send + Sync {
    fn record(&self, record: TelemetryRecord);
}

/// Emits each record as a `tracing` error event with a JSON payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn record(&self, record: TelemetryRecord) {
        let payload = serde_json::to_string(&record.attributes)
            .unwrap_or_else(|_| record.attributes.error.clone());
        error!(
            category = record.category,
            operation = %record.attributes.operation,
            "storage failure: {}",
            payload
        );
    }
}
