//! Property-Based Tests for the Storage Service
//!
//! Uses proptest to check namespacing, size admission, expiration and
//! in-flight accounting over the memory adapter.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::adapter::MemoryAdapter;
use crate::collaborators::{Collaborators, ManualClock};
use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::service::{sweep_interval_for, StorageService, SWEEP_INTERVAL_MAX, SWEEP_INTERVAL_MIN};

// == Strategies ==
/// Generates valid user keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,32}"
}

/// Generates small JSON values
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,64}".prop_map(Value::from),
    ]
}

fn memory_service(config: StorageConfig, clock: &ManualClock) -> StorageService {
    let collab = Collaborators::default().with_clock(Arc::new(clock.clone()));
    StorageService::memory(config, collab).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Whatever the item lifetime, sweeps are at least a minute and at most
    // five minutes apart.
    #[test]
    fn prop_sweep_interval_clamped(expiration in 0u64..10_000_000) {
        let interval = sweep_interval_for(Duration::from_secs(expiration));
        prop_assert!(interval >= SWEEP_INTERVAL_MIN);
        prop_assert!(interval <= SWEEP_INTERVAL_MAX);

        let clock = ManualClock::new(0);
        let svc = memory_service(StorageConfig::new("p").with_expiration(expiration), &clock);
        prop_assert_eq!(svc.sweep_interval(), interval);
    }

    // A value written and awaited is read back unchanged, and is gone after
    // an awaited remove.
    #[test]
    fn prop_roundtrip_then_remove(key in valid_key_strategy(), value in value_strategy()) {
        let clock = ManualClock::new(0);
        let svc = memory_service(StorageConfig::new("p"), &clock);

        tokio_test::block_on(async {
            svc.set(&key, value.clone()).await.unwrap();
            assert_eq!(svc.get(&key, false).await.unwrap(), Some(value));

            svc.remove(&key, false).await.unwrap();
            assert_eq!(svc.get(&key, false).await.unwrap(), None);
            assert_eq!(svc.operations_in_flight(), 0);
        });
    }

    // When any member is too large, no member of the batch is stored.
    #[test]
    fn prop_all_or_none(
        small in prop::collection::hash_map(valid_key_strategy(), value_strategy(), 1..8),
        huge_len in 600usize..2_000,
    ) {
        let clock = ManualClock::new(0);
        let svc = memory_service(StorageConfig::new("p").with_max_size(1024), &clock);

        let mut batch: Vec<(String, Value)> = small.into_iter().collect();
        batch.push(("huge".to_string(), json!("x".repeat(huge_len))));

        tokio_test::block_on(async {
            let result = svc.set_all(batch).await;
            assert!(matches!(result, Err(StorageError::SizeExceeded { .. })));
            assert!(svc.get_all(None, true).await.unwrap().is_empty());
            assert_eq!(svc.operations_in_flight(), 0);
        });
    }

    // Storages on one backend with different isolation keys never see each
    // other's entries.
    #[test]
    fn prop_namespace_isolation(
        keys in prop::collection::hash_set(valid_key_strategy(), 1..10),
        iso_a in "[a-z]{1,8}",
        iso_b in "[A-Z]{1,8}",
    ) {
        let clock = ManualClock::new(0);
        let config_a = StorageConfig::new("a").with_isolation_key(iso_a);
        let config_b = StorageConfig::new("b").with_isolation_key(iso_b);
        let backend = MemoryAdapter::with_clock(&config_a.adapter_config(), Arc::new(clock.clone()));

        let collab = Collaborators::default().with_clock(Arc::new(clock.clone()));
        let shared = backend.clone();
        let svc_a = StorageService::new(config_a, move |c| Arc::new(shared.attach(c)), collab.clone()).unwrap();
        let shared = backend.clone();
        let svc_b = StorageService::new(config_b, move |c| Arc::new(shared.attach(c)), collab).unwrap();

        tokio_test::block_on(async {
            let values: Vec<(String, Value)> =
                keys.iter().map(|k| (k.clone(), json!("from-a"))).collect();
            svc_a.set_all(values).await.unwrap();

            assert!(svc_b.get_all(None, true).await.unwrap().is_empty());
            let seen_by_a = svc_a.get_all(None, false).await.unwrap();
            assert_eq!(seen_by_a.len(), keys.len());

            svc_b.clear().await.unwrap();
            assert_eq!(svc_a.get_all(None, false).await.unwrap().len(), keys.len());
        });
        prop_assert_eq!(backend.len(), keys.len());
    }

    // Items become invisible to normal reads once their lifetime has passed,
    // but stay readable with include_expired until swept.
    #[test]
    fn prop_expiration_boundary(key in valid_key_strategy(), extra_ms in 0u64..5_000) {
        let clock = ManualClock::new(10_000);
        let svc = memory_service(StorageConfig::new("p").with_expiration(1), &clock);

        tokio_test::block_on(async {
            svc.set(&key, json!("v")).await.unwrap();

            clock.advance(Duration::from_millis(999));
            assert_eq!(svc.get(&key, false).await.unwrap(), Some(json!("v")));

            clock.advance(Duration::from_millis(1 + extra_ms));
            assert_eq!(svc.get(&key, false).await.unwrap(), None);
            assert_eq!(svc.get(&key, true).await.unwrap(), Some(json!("v")));
        });
    }
}
