//! Configuration Module
//!
//! Storage configuration, loadable from environment variables, plus the
//! derived configuration handed to adapter factories.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Separates the isolation key and version from user keys.
pub const KEY_DELIMITER: &str = ":";

/// Storage configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Name of the storage area
    pub name: String,
    /// Storage version, part of the key prefix
    pub version: String,
    /// Namespace discriminator (per user, per tenant)
    pub isolation_key: String,
    /// Maximum size in bytes
    pub max_size: usize,
    /// Item lifetime in seconds
    pub expiration: u64,
    /// Default auto-refresh interval in seconds
    pub auto_refresh_interval: u64,
    /// Emit debug log lines
    pub debug_logging: bool,
    /// Ask the adapter to wipe its contents on creation
    pub clear_on_init: bool,
}

impl StorageConfig {
    /// Creates a config with the given name and default values otherwise.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a new StorageConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `STORAGE_NAME` - Storage name (default: "default")
    /// - `STORAGE_VERSION` - Version string (default: "")
    /// - `STORAGE_ISOLATION_KEY` - Isolation key (default: "")
    /// - `STORAGE_MAX_SIZE` - Max size in bytes (default: 1048576)
    /// - `STORAGE_EXPIRATION` - Expiration in seconds (default: 10)
    /// - `STORAGE_AUTO_REFRESH_INTERVAL` - Auto-refresh interval in seconds (default: 30)
    /// - `STORAGE_DEBUG_LOGGING` - Debug logging (default: false)
    /// - `STORAGE_CLEAR_ON_INIT` - Clear on init (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: env::var("STORAGE_NAME").unwrap_or(defaults.name),
            version: env::var("STORAGE_VERSION").unwrap_or(defaults.version),
            isolation_key: env::var("STORAGE_ISOLATION_KEY").unwrap_or(defaults.isolation_key),
            max_size: parse_var("STORAGE_MAX_SIZE").unwrap_or(defaults.max_size),
            expiration: parse_var("STORAGE_EXPIRATION").unwrap_or(defaults.expiration),
            auto_refresh_interval: parse_var("STORAGE_AUTO_REFRESH_INTERVAL")
                .unwrap_or(defaults.auto_refresh_interval),
            debug_logging: parse_var("STORAGE_DEBUG_LOGGING").unwrap_or(defaults.debug_logging),
            clear_on_init: parse_var("STORAGE_CLEAR_ON_INIT").unwrap_or(defaults.clear_on_init),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_isolation_key(mut self, isolation_key: impl Into<String>) -> Self {
        self.isolation_key = isolation_key.into();
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_expiration(mut self, seconds: u64) -> Self {
        self.expiration = seconds;
        self
    }

    pub fn with_auto_refresh_interval(mut self, seconds: u64) -> Self {
        self.auto_refresh_interval = seconds;
        self
    }

    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    pub fn with_clear_on_init(mut self, enabled: bool) -> Self {
        self.clear_on_init = enabled;
        self
    }

    /// Prefix applied to every user key: isolation key, version, delimiter.
    pub fn key_prefix(&self) -> String {
        format!("{}{}{}", self.isolation_key, self.version, KEY_DELIMITER)
    }

    /// Derives the configuration handed to the adapter factory.
    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            name: self.name.clone(),
            key_prefix: self.key_prefix(),
            max_size: self.max_size,
            expiration: Duration::from_secs(self.expiration),
            debug_logging: self.debug_logging,
            clear_on_init: self.clear_on_init,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            version: String::new(),
            isolation_key: String::new(),
            max_size: 1024 * 1024,
            expiration: 10,
            auto_refresh_interval: 30,
            debug_logging: false,
            clear_on_init: false,
        }
    }
}

/// Configuration passed to an adapter when the service creates it.
///
/// `key_prefix` is already computed so adapters can namespace their own
/// bookkeeping (clearing, for example) if they need to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    pub name: String,
    pub key_prefix: String,
    pub max_size: usize,
    pub expiration: Duration,
    pub debug_logging: bool,
    pub clear_on_init: bool,
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
