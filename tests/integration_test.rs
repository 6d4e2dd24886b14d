//! Integration tests for cache-bridge
//!
//! These tests verify end-to-end adapter behavior across key construction,
//! the codec, the storage protocol, and error containment.

#![cfg(feature = "inmemory")]

use async_trait::async_trait;
use cache_bridge::observability::{AtomicMetrics, Telemetry, TelemetryConfig};
use cache_bridge::serialization::StoredEnvelope;
use cache_bridge::store::{KeyValueStore, MemoryStore};
use cache_bridge::{Error, KeyValueCache, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct User {
    id: String,
    name: String,
    email: String,
}

fn sample_user() -> User {
    User {
        id: "user_123".to_string(),
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
    }
}

/// Store whose every call fails, for error-containment tests.
struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &str, _collection: &str) -> Result<Option<StoredEnvelope>> {
        Err(Error::BackendError("connection refused".to_string()))
    }

    async fn put(
        &self,
        _key: &str,
        _value: StoredEnvelope,
        _collection: &str,
        _ttl: Option<Duration>,
    ) -> Result<()> {
        Err(Error::BackendError("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str, _collection: &str) -> Result<bool> {
        Err(Error::BackendError("connection refused".to_string()))
    }
}

fn memory_cache() -> KeyValueCache {
    let _ = env_logger::builder().is_test(true).try_init();
    KeyValueCache::builder(MemoryStore::new())
        .key_prefix("app")
        .build()
        .expect("Failed to build cache")
}

#[tokio::test]
async fn test_structured_value_roundtrip() {
    let cache = memory_cache();
    let user = sample_user();

    cache.set("user", &user, None, None).await;
    let loaded: Option<User> = cache.get("user", None).await;
    assert_eq!(loaded, Some(user));
}

#[tokio::test]
async fn test_binary_fallback_roundtrip_through_adapter() {
    let cache = memory_cache();

    // Tuple map keys cannot be expressed in JSON, exercising the binary tier.
    let mut value: BTreeMap<(u8, u8), String> = BTreeMap::new();
    value.insert((1, 2), "v".to_string());

    cache.set("tuples", &value, None, None).await;
    let loaded: Option<BTreeMap<(u8, u8), String>> = cache.get("tuples", None).await;
    assert_eq!(loaded, Some(value));
}

#[tokio::test]
async fn test_version_isolation() {
    let cache = memory_cache();

    cache.set("k", &"v1", None, Some(1)).await;
    cache.set("k", &"v2", None, Some(2)).await;

    let v1: Option<String> = cache.get("k", Some(1)).await;
    let v2: Option<String> = cache.get("k", Some(2)).await;
    assert_eq!(v1, Some("v1".to_string()));
    assert_eq!(v2, Some("v2".to_string()));
}

#[tokio::test]
async fn test_collection_isolation() {
    // Two adapters differing only in collection, same store instance.
    let store = MemoryStore::new();
    let cache_a = KeyValueCache::builder(store.clone())
        .collection("alpha")
        .build()
        .expect("Failed to build cache");
    let cache_b = KeyValueCache::builder(store)
        .collection("beta")
        .build()
        .expect("Failed to build cache");

    cache_a.set("shared", &"a", None, None).await;
    cache_b.set("shared", &"b", None, None).await;

    let a: Option<String> = cache_a.get("shared", None).await;
    let b: Option<String> = cache_b.get("shared", None).await;
    assert_eq!(a, Some("a".to_string()));
    assert_eq!(b, Some("b".to_string()));

    cache_a.delete("shared", None).await;
    let b: Option<String> = cache_b.get("shared", None).await;
    assert_eq!(b, Some("b".to_string()));
}

#[tokio::test]
async fn test_prefix_isolation() {
    let store = MemoryStore::new();
    let cache_a = KeyValueCache::builder(store.clone())
        .key_prefix("one")
        .build()
        .expect("Failed to build cache");
    let cache_b = KeyValueCache::builder(store)
        .key_prefix("two")
        .build()
        .expect("Failed to build cache");

    cache_a.set("k", &1_i64, None, None).await;
    let other: Option<i64> = cache_b.get("k", None).await;
    assert_eq!(other, None);
}

#[tokio::test]
async fn test_miss_vs_stored_null() {
    let cache = memory_cache();

    // Miss: the default stands in.
    let missing: Option<String> = cache.get_or("unset", None).await;
    assert_eq!(missing, None);
    let defaulted: i64 = cache.get_or("unset", 99).await;
    assert_eq!(defaulted, 99);

    // Stored null: a present envelope with a null payload, not a miss.
    cache.set("null_key", &None::<String>, None, None).await;
    let stored: Option<Option<String>> = cache.get("null_key", None).await;
    assert_eq!(stored, Some(None));
    assert!(cache.has_key("null_key", None).await);
}

#[tokio::test]
async fn test_empty_values_roundtrip() {
    let cache = memory_cache();

    cache.set("empty_string", &"", None, None).await;
    cache.set("zero", &0_i64, None, None).await;

    assert_eq!(
        cache.get::<String>("empty_string", None).await,
        Some(String::new())
    );
    assert_eq!(cache.get::<i64>("zero", None).await, Some(0));
}

#[tokio::test]
async fn test_batch_semantics() {
    let cache = memory_cache();

    // Empty inputs short-circuit.
    assert!(cache.get_many::<i64>(&[], None).await.is_empty());
    cache.set_many::<i64>(&HashMap::new(), None, None).await;
    cache.delete_many(&[], None).await;

    let mut data = HashMap::new();
    data.insert("k1".to_string(), 1_i64);
    data.insert("k3".to_string(), 3_i64);
    cache.set_many(&data, None, None).await;

    // Only hits appear in the result.
    let found: HashMap<String, i64> = cache.get_many(&["k1", "k2", "k3"], None).await;
    assert_eq!(found.len(), 2);
    assert_eq!(found["k1"], 1);
    assert_eq!(found["k3"], 3);
    assert!(!found.contains_key("k2"));

    cache.delete_many(&["k1", "k3"], None).await;
    assert!(cache.get_many::<i64>(&["k1", "k3"], None).await.is_empty());
}

#[tokio::test]
async fn test_add_semantics() {
    let cache = memory_cache();

    assert!(cache.add("k", &"first", None, None).await);
    assert!(!cache.add("k", &"second", None, None).await);

    let value: Option<String> = cache.get("k", None).await;
    assert_eq!(value, Some("first".to_string()));

    // A stored null counts as present.
    cache.set("null_key", &None::<String>, None, None).await;
    assert!(!cache.add("null_key", &"v", None, None).await);
}

#[tokio::test]
async fn test_ttl_expiry() {
    let cache = memory_cache();

    cache
        .set("short_lived", &"v", Some(Duration::from_millis(100)), None)
        .await;

    let present: Option<String> = cache.get("short_lived", None).await;
    assert_eq!(present, Some("v".to_string()));

    tokio::time::sleep(Duration::from_millis(150)).await;

    let expired: Option<String> = cache.get("short_lived", None).await;
    assert_eq!(expired, None);
    assert!(!cache.has_key("short_lived", None).await);
}

#[tokio::test]
async fn test_delete_reports_removal() {
    let cache = memory_cache();

    cache.set("k", &"v", None, None).await;
    assert!(cache.delete("k", None).await);
    assert!(!cache.delete("k", None).await);
}

#[tokio::test]
async fn test_clear_always_fails() {
    let cache = memory_cache();
    match cache.clear().await {
        Err(Error::Unsupported(_)) => {}
        other => panic!("Expected Unsupported, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_containment() {
    // A store whose every call fails still yields safe results.
    let metrics = Arc::new(AtomicMetrics::new());
    let telemetry = Arc::new(Telemetry::new(TelemetryConfig::enabled(), metrics.clone()));
    let cache = KeyValueCache::builder(FailingStore)
        .telemetry(telemetry)
        .build()
        .expect("Failed to build cache");

    let got: Option<String> = cache.get("k", None).await;
    assert_eq!(got, None);
    assert_eq!(cache.get_or("k", 5_i64).await, 5);

    cache.set("k", &"v", None, None).await; // no panic, no error surfaced
    assert!(!cache.delete("k", None).await);
    assert!(!cache.has_key("k", None).await);
    assert!(cache.get_many::<String>(&["a", "b"], None).await.is_empty());

    let mut data = HashMap::new();
    data.insert("a".to_string(), 1_i64);
    cache.set_many(&data, None, None).await;
    cache.delete_many(&["a"], None).await;

    // Every failed call was recorded: get, get_or, set, delete, has_key,
    // get_many, set_many, delete_many.
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.errors, 8);
    assert_eq!(snapshot.requests, 8);
    assert_eq!(snapshot.hits, 0);
}

#[tokio::test]
async fn test_add_with_failing_store_still_contained() {
    let cache = KeyValueCache::builder(FailingStore)
        .build()
        .expect("Failed to build cache");

    // Presence check fails -> treated as absent; the write fails silently.
    assert!(cache.add("k", &"v", None, None).await);
}

#[tokio::test]
async fn test_batch_metrics_counts() {
    let metrics = Arc::new(AtomicMetrics::new());
    let telemetry = Arc::new(Telemetry::new(TelemetryConfig::enabled(), metrics.clone()));
    let cache = KeyValueCache::builder(MemoryStore::new())
        .telemetry(telemetry)
        .build()
        .expect("Failed to build cache");

    let mut data = HashMap::new();
    data.insert("k1".to_string(), 1_i64);
    data.insert("k2".to_string(), 2_i64);
    cache.set_many(&data, None, None).await;

    let _: HashMap<String, i64> = cache.get_many(&["k1", "k2", "k3"], None).await;

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.requests, 2); // set_many + get_many
    assert_eq!(snapshot.hits, 2);
    assert_eq!(snapshot.misses, 1);
}

#[tokio::test]
async fn test_concurrent_adapter_sharing() {
    let cache = Arc::new(memory_cache());
    let mut handles = vec![];

    for i in 0..8 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            let key = format!("key_{}", i);
            cache.set(&key, &i, None, None).await;
            let value: Option<i32> = cache.get(&key, None).await;
            assert_eq!(value, Some(i));
        }));
    }

    for handle in handles {
        handle.await.expect("Task failed");
    }
}
