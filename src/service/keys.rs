//! Key namespacing and write payload construction.

use std::collections::HashSet;
use std::time::Duration;

use serde_json::Value;

use crate::adapter::{ItemPayload, StoredItem};
use crate::collaborators::SizeEstimator;
use crate::error::{Result, StorageError};

// == Key Namespace ==
/// Maps user keys to and from namespaced adapter keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeyNamespace {
    prefix: String,
}

impl KeyNamespace {
    pub(crate) fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn apply(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub(crate) fn apply_all(&self, keys: &[String]) -> Vec<String> {
        keys.iter().map(|key| self.apply(key)).collect()
    }

    /// Returns the user key, or `None` for keys of another namespace.
    pub(crate) fn strip<'a>(&self, namespaced: &'a str) -> Option<&'a str> {
        namespaced.strip_prefix(self.prefix.as_str())
    }
}

/// Rejects keys the service cannot namespace meaningfully.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidArgument(
            "key must be a non-empty string".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_keys(keys: &[String]) -> Result<()> {
    keys.iter().try_for_each(|key| validate_key(key))
}

// == Write Batch ==
/// Payloads admitted under the size limit, in caller order.
#[derive(Debug)]
pub(crate) struct WriteBatch {
    pub(crate) payloads: Vec<ItemPayload>,
    /// User keys, aligned with `payloads`
    pub(crate) keys: Vec<String>,
    pub(crate) total_size: usize,
}

/// Everything needed to turn user values into payloads.
pub(crate) struct PayloadBuilder<'a> {
    pub(crate) namespace: &'a KeyNamespace,
    pub(crate) estimator: &'a dyn SizeEstimator,
    pub(crate) now_ms: i64,
    pub(crate) expiration: Duration,
    pub(crate) max_size: usize,
}

impl PayloadBuilder<'_> {
    /// Builds the whole batch or fails without building any of it.
    ///
    /// Sizes cover the user key and the value; the namespace prefix is not
    /// counted. A repeated key keeps its last value.
    pub(crate) fn build(&self, values: Vec<(String, Value)>) -> Result<WriteBatch> {
        let mut seen = HashSet::with_capacity(values.len());
        let mut unique: Vec<(String, Value)> = values
            .into_iter()
            .rev()
            .filter(|(key, _)| seen.insert(key.clone()))
            .collect();
        unique.reverse();

        let mut batch = WriteBatch {
            payloads: Vec::with_capacity(unique.len()),
            keys: Vec::with_capacity(unique.len()),
            total_size: 0,
        };

        for (key, value) in unique {
            validate_key(&key)?;
            let size = self.estimator.estimate_key(&key) + self.estimator.estimate_value(&value);
            if size > self.max_size {
                return Err(StorageError::SizeExceeded {
                    key,
                    size,
                    max_size: self.max_size,
                });
            }

            batch.total_size += size;
            batch.payloads.push(ItemPayload {
                key: self.namespace.apply(&key),
                item: StoredItem::new(value, self.now_ms, self.expiration),
                size,
            });
            batch.keys.push(key);
        }

        if batch.total_size > self.max_size {
            return Err(StorageError::SizeExceeded {
                key: format!("batch of {} items", batch.payloads.len()),
                size: batch.total_size,
                max_size: self.max_size,
            });
        }
        Ok(batch)
    }
}
