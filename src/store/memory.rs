//! In-memory store (default, thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.
//! Automatically handles TTL expiration on access.

use super::KeyValueStore;
use crate::error::Result;
use crate::serialization::StoredEnvelope;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Stored entry with optional expiration.
struct MemoryEntry {
    envelope: StoredEnvelope,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn new(envelope: StoredEnvelope, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        MemoryEntry {
            envelope,
            expires_at,
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

/// Thread-safe async in-memory store.
///
/// Entries are keyed by `(collection, key)` so adapters configured with
/// different collection names share the instance without observing each
/// other. No async locks required - operations are non-blocking.
///
/// # Example
///
/// ```no_run
/// use cache_bridge::store::{KeyValueStore, MemoryStore};
/// use cache_bridge::serialization::StoredEnvelope;
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStore::new();
///
///     store
///         .put("key1", StoredEnvelope::structured(json!("value")), "cache", None)
///         .await?;
///
///     let value = store.get("key1", "cache").await?;
///     assert!(value.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<(String, String), MemoryEntry>>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        MemoryStore {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Current number of entries across all collections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn slot(collection: &str, key: &str) -> (String, String) {
        (collection.to_string(), key.to_string())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str, collection: &str) -> Result<Option<StoredEnvelope>> {
        let slot = Self::slot(collection, key);
        if let Some(entry) = self.entries.get(&slot) {
            if !entry.is_expired() {
                debug!("✓ Memory GET {}/{} -> HIT", collection, key);
                return Ok(Some(entry.envelope.clone()));
            }
        }

        // Remove expired entry if it exists
        self.entries.remove(&slot);
        debug!("✓ Memory GET {}/{} -> MISS", collection, key);
        Ok(None)
    }

    async fn put(
        &self,
        key: &str,
        value: StoredEnvelope,
        collection: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let entry = MemoryEntry::new(value, ttl);
        self.entries.insert(Self::slot(collection, key), entry);

        if let Some(d) = ttl {
            debug!("✓ Memory PUT {}/{} (TTL: {:?})", collection, key, d);
        } else {
            debug!("✓ Memory PUT {}/{}", collection, key);
        }

        Ok(())
    }

    async fn delete(&self, key: &str, collection: &str) -> Result<bool> {
        let removed = match self.entries.remove(&Self::slot(collection, key)) {
            Some((_, entry)) => !entry.is_expired(),
            None => false,
        };
        debug!("✓ Memory DELETE {}/{} -> {}", collection, key, removed);
        Ok(removed)
    }

    async fn get_many(
        &self,
        keys: &[String],
        collection: &str,
    ) -> Result<Vec<Option<StoredEnvelope>>> {
        let results = keys
            .iter()
            .map(|key| {
                self.entries
                    .get(&Self::slot(collection, key))
                    .filter(|entry| !entry.is_expired())
                    .map(|entry| entry.envelope.clone())
            })
            .collect();

        debug!("✓ Memory GET_MANY {} keys in {}", keys.len(), collection);
        Ok(results)
    }

    async fn delete_many(&self, keys: &[String], collection: &str) -> Result<usize> {
        let mut removed = 0;
        for key in keys {
            if self.entries.remove(&Self::slot(collection, key)).is_some() {
                removed += 1;
            }
        }

        debug!(
            "✓ Memory DELETE_MANY {} keys in {} -> {} removed",
            keys.len(),
            collection,
            removed
        );
        Ok(removed)
    }
}
