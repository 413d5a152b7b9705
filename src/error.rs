//! Error types for the storage service
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Storage Error Enum ==
/// Unified error type for the storage service and its adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Malformed arguments, raised before any adapter work starts
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A single item or a whole batch does not fit in the storage
    #[error("Cannot store {key} of size {size}b because it's over the max size of {max_size}b")]
    SizeExceeded {
        /// Offending key, or a description of the batch
        key: String,
        /// Estimated size in bytes
        size: usize,
        /// Configured limit in bytes
        max_size: usize,
    },

    /// Failure surfaced by the persistence adapter
    #[error("Adapter error: {0}")]
    Adapter(String),
}

impl StorageError {
    /// Shorthand for building an adapter failure.
    pub fn adapter(message: impl Into<String>) -> Self {
        StorageError::Adapter(message.into())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the storage service.
pub type Result<T> = std::result::Result<T, StorageError>;
