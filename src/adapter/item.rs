//! Stored Item Module
//!
//! Defines the tuples exchanged with adapters: stored items with their
//! timestamps, and write payloads carrying a size estimate.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Stored Item ==
/// A value together with its creation and expiration timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    /// The stored value
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created: i64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires: i64,
}

impl StoredItem {
    // == Constructor ==
    /// Creates an item created at `created_ms` that lives for `expiration`.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `created_ms` - Creation time in Unix milliseconds
    /// * `expiration` - Lifetime of the item
    pub fn new(value: Value, created_ms: i64, expiration: Duration) -> Self {
        let lifetime_ms = i64::try_from(expiration.as_millis()).unwrap_or(i64::MAX);
        Self {
            value,
            created: created_ms,
            expires: created_ms.saturating_add(lifetime_ms),
        }
    }

    // == Is Expired ==
    /// Checks if the item has expired at `now_ms`.
    ///
    /// Boundary condition: an item is visible only while `now < expires`, so
    /// it counts as expired from the exact expiration instant onward.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires
    }
}

// == Item Payload ==
/// One entry of a write batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPayload {
    /// Namespaced key
    pub key: String,
    pub item: StoredItem,
    /// Estimated size of the unprefixed key plus the value
    pub size: usize,
}
