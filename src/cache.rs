//! Cache adapter - the operation surface callers use.
//!
//! [`KeyValueCache`] composes the key formatter, the value codec, the
//! wrapper chain, and a concrete store behind the cache contract a web
//! framework expects: single and batch get/set/delete, `add`, `has_key`,
//! and a permanently-failing `clear`.
//!
//! Failure policy: configuration problems fail at build time and nowhere
//! else. At operation time every backend or codec failure is caught,
//! recorded through telemetry, and converted to the operation's safe
//! result - a miss for reads, a no-op for writes, `false` for boolean
//! operations, an empty mapping for batch reads. Callers never see a
//! backend error type.
//!
//! Get is tri-state: a hit with a value, a hit with a stored null (an
//! envelope whose payload is null - round-trips as `Some(None)` for
//! `Option<T>` values), and a miss (`None`).

use crate::config::{CacheConfig, WrapperSpec};
use crate::error::{Error, Result};
use crate::key::CacheKeyBuilder;
use crate::observability::Telemetry;
use crate::serialization;
use crate::store::KeyValueStore;
use crate::wrapper::apply_wrappers;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument as _;

/// Builder for [`KeyValueCache`].
///
/// # Example
///
/// ```
/// use cache_bridge::{KeyValueCache, store::MemoryStore};
///
/// # fn main() -> cache_bridge::Result<()> {
/// let cache = KeyValueCache::builder(MemoryStore::new())
///     .collection("sessions")
///     .key_prefix("app")
///     .version(2)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct KeyValueCacheBuilder {
    store: Arc<dyn KeyValueStore>,
    config: CacheConfig,
    telemetry: Option<Arc<Telemetry>>,
}

impl KeyValueCacheBuilder {
    /// Start building over a concrete store.
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        KeyValueCacheBuilder {
            store: Arc::new(store),
            config: CacheConfig::default(),
            telemetry: None,
        }
    }

    /// Replace the whole configuration (collection, prefix, version,
    /// wrappers, key material) in one call.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the collection name.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.config.collection = collection.into();
        self
    }

    /// Set the key prefix.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    /// Set the default key version.
    pub fn version(mut self, version: u32) -> Self {
        self.config.version = version;
        self
    }

    /// Append a wrapper to the chain.
    pub fn wrapper(mut self, spec: WrapperSpec) -> Self {
        self.config.wrappers.push(spec);
        self
    }

    /// Set the configured encryption key material.
    pub fn encryption_key(mut self, key: impl Into<String>) -> Self {
        self.config.encryption_key = Some(key.into());
        self
    }

    /// Set the process-wide secret used for key derivation.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.config.secret = Some(secret.into());
        self
    }

    /// Attach a telemetry context. Defaults to disabled telemetry.
    pub fn telemetry(mut self, telemetry: Arc<Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Validate the configuration, apply the wrapper chain, and build the
    /// adapter.
    ///
    /// # Errors
    /// `Error::ConfigError` for an invalid prefix or collection, an
    /// unsupported wrapper, or missing encryption key material.
    pub fn build(self) -> Result<KeyValueCache> {
        self.config.validate()?;

        let backend_name = self.store.name();
        let store = apply_wrappers(self.store, &self.config)?;

        info!(
            "✓ Cache adapter initialized: backend={} collection={}",
            backend_name, self.config.collection
        );

        Ok(KeyValueCache {
            store,
            backend_name,
            collection: self.config.collection,
            key_prefix: self.config.key_prefix,
            version: self.config.version,
            telemetry: self.telemetry.unwrap_or_else(|| Arc::new(Telemetry::disabled())),
        })
    }
}

/// The cache adapter.
///
/// Bound to exactly one store, one collection, one key prefix/version, and
/// one wrapper chain. Holds no per-request state and no locks: clones share
/// the underlying store and can be used concurrently.
#[derive(Clone)]
pub struct KeyValueCache {
    store: Arc<dyn KeyValueStore>,
    backend_name: &'static str,
    collection: String,
    key_prefix: String,
    version: u32,
    telemetry: Arc<Telemetry>,
}

impl KeyValueCache {
    /// Start building an adapter over a store.
    pub fn builder(store: impl KeyValueStore + 'static) -> KeyValueCacheBuilder {
        KeyValueCacheBuilder::new(store)
    }

    /// The collection this adapter addresses.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The backend label.
    pub fn backend_name(&self) -> &str {
        self.backend_name
    }

    /// The wrapped store (for advanced use).
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    fn make_key(&self, key: &str, version: Option<u32>) -> String {
        CacheKeyBuilder::build(&self.key_prefix, version.unwrap_or(self.version), &key)
    }

    /// Retrieve and decode a value.
    ///
    /// Returns `None` on a miss and on any backend or decode failure
    /// (recorded, never raised). A stored null is a hit: with
    /// `T = Option<U>` it comes back as `Some(None)`, distinct from the
    /// miss `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, version: Option<u32>) -> Option<T> {
        let cache_key = self.make_key(key, version);
        let span = self.telemetry.span("get", self.backend_name, &self.collection);
        span.record("key", cache_key.as_str());

        let result = match self
            .store
            .get(&cache_key, &self.collection)
            .instrument(span.clone())
            .await
        {
            Ok(result) => result,
            Err(e) => {
                debug!("get failed for {}: {}", cache_key, e);
                self.telemetry.record_request(self.backend_name, "get");
                self.telemetry.record_error(self.backend_name, "get");
                return None;
            }
        };

        let hit = result.is_some();
        span.record("hit", hit);
        self.telemetry.record_request(self.backend_name, "get");
        if hit {
            self.telemetry.record_hit(self.backend_name, "get");
        } else {
            self.telemetry.record_miss(self.backend_name, "get");
        }

        match result {
            Some(envelope) => match serialization::decode(&envelope) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!("decode failed for {}: {}", cache_key, e);
                    self.telemetry.record_error(self.backend_name, "get");
                    None
                }
            },
            None => None,
        }
    }

    /// [`get`](Self::get) with the adapter's default version, substituting
    /// `default` on a miss.
    pub async fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.get(key, None).await {
            Some(value) => value,
            None => default,
        }
    }

    /// Encode and store a value.
    ///
    /// `ttl: None` means no expiry. Failures are recorded and the write is
    /// dropped; there are no retries.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        version: Option<u32>,
    ) {
        let cache_key = self.make_key(key, version);

        let envelope = match serialization::encode(value) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("encode failed for {}: {}", cache_key, e);
                self.telemetry.record_request(self.backend_name, "set");
                self.telemetry.record_error(self.backend_name, "set");
                return;
            }
        };

        let span = self.telemetry.span("set", self.backend_name, &self.collection);
        span.record("key", cache_key.as_str());
        span.record("ttl", ttl.map(|d| d.as_secs_f64()).unwrap_or(-1.0));

        match self
            .store
            .put(&cache_key, envelope, &self.collection, ttl)
            .instrument(span.clone())
            .await
        {
            Ok(()) => {
                self.telemetry.record_request(self.backend_name, "set");
            }
            Err(e) => {
                debug!("set failed for {}: {}", cache_key, e);
                self.telemetry.record_request(self.backend_name, "set");
                self.telemetry.record_error(self.backend_name, "set");
            }
        }
    }

    /// Delete a key.
    ///
    /// Returns whether something was actually removed; `false` on failure.
    pub async fn delete(&self, key: &str, version: Option<u32>) -> bool {
        let cache_key = self.make_key(key, version);
        let span = self
            .telemetry
            .span("delete", self.backend_name, &self.collection);
        span.record("key", cache_key.as_str());

        match self
            .store
            .delete(&cache_key, &self.collection)
            .instrument(span.clone())
            .await
        {
            Ok(removed) => {
                span.record("deleted", removed);
                self.telemetry.record_request(self.backend_name, "delete");
                if removed {
                    self.telemetry.record_hit(self.backend_name, "delete");
                } else {
                    self.telemetry.record_miss(self.backend_name, "delete");
                }
                removed
            }
            Err(e) => {
                debug!("delete failed for {}: {}", cache_key, e);
                self.telemetry.record_request(self.backend_name, "delete");
                self.telemetry.record_error(self.backend_name, "delete");
                false
            }
        }
    }

    /// Store a value only if the key is absent.
    ///
    /// Returns `true` if the key was absent and is now set. A stored null
    /// counts as present.
    ///
    /// NOT atomic: the presence check and the write are separate store
    /// calls, so two concurrent `add`s on the same key can both observe
    /// "absent" and both succeed. Callers needing at-most-once insertion
    /// must coordinate externally.
    pub async fn add<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        version: Option<u32>,
    ) -> bool {
        if self.has_key(key, version).await {
            return false;
        }
        self.set(key, value, ttl, version).await;
        true
    }

    /// Retrieve multiple keys. The result contains only hits.
    ///
    /// Empty input returns an empty map without touching the backend. A
    /// backend failure degrades the whole batch to "no hits" rather than
    /// partial results.
    pub async fn get_many<T: DeserializeOwned>(
        &self,
        keys: &[&str],
        version: Option<u32>,
    ) -> HashMap<String, T> {
        if keys.is_empty() {
            return HashMap::new();
        }

        let cache_keys: Vec<String> = keys.iter().map(|k| self.make_key(k, version)).collect();
        let span = self
            .telemetry
            .span("get_many", self.backend_name, &self.collection);
        span.record("key_count", keys.len() as u64);

        let results = match self
            .store
            .get_many(&cache_keys, &self.collection)
            .instrument(span.clone())
            .await
        {
            Ok(results) => results,
            Err(e) => {
                debug!("get_many failed: {}", e);
                self.telemetry.record_request(self.backend_name, "get_many");
                self.telemetry.record_error(self.backend_name, "get_many");
                return HashMap::new();
            }
        };

        let mut output = HashMap::new();
        let mut hit_count = 0u64;
        let mut miss_count = 0u64;
        for (i, key) in keys.iter().enumerate() {
            match results.get(i).and_then(|r| r.as_ref()) {
                Some(envelope) => match serialization::decode(envelope) {
                    Ok(value) => {
                        output.insert(key.to_string(), value);
                        hit_count += 1;
                    }
                    Err(e) => {
                        debug!("decode failed for {}: {}", key, e);
                        self.telemetry.record_error(self.backend_name, "get_many");
                    }
                },
                None => miss_count += 1,
            }
        }

        span.record("hit_count", hit_count);
        span.record("miss_count", miss_count);
        self.telemetry.record_request(self.backend_name, "get_many");
        self.telemetry
            .record_hits(self.backend_name, "get_many", hit_count);
        self.telemetry
            .record_misses(self.backend_name, "get_many", miss_count);
        output
    }

    /// Store multiple values with a shared TTL.
    ///
    /// Empty input is a no-op. Any encode failure drops the whole batch;
    /// nothing is retried.
    pub async fn set_many<T: Serialize>(
        &self,
        data: &HashMap<String, T>,
        ttl: Option<Duration>,
        version: Option<u32>,
    ) {
        if data.is_empty() {
            return;
        }

        let mut entries = Vec::with_capacity(data.len());
        for (key, value) in data {
            match serialization::encode(value) {
                Ok(envelope) => entries.push((self.make_key(key, version), envelope)),
                Err(e) => {
                    debug!("encode failed for {}: {}", key, e);
                    self.telemetry.record_request(self.backend_name, "set_many");
                    self.telemetry.record_error(self.backend_name, "set_many");
                    return;
                }
            }
        }

        let span = self
            .telemetry
            .span("set_many", self.backend_name, &self.collection);
        span.record("key_count", data.len() as u64);
        span.record("ttl", ttl.map(|d| d.as_secs_f64()).unwrap_or(-1.0));

        match self
            .store
            .put_many(entries, &self.collection, ttl)
            .instrument(span.clone())
            .await
        {
            Ok(()) => {
                self.telemetry.record_request(self.backend_name, "set_many");
            }
            Err(e) => {
                debug!("set_many failed: {}", e);
                self.telemetry.record_request(self.backend_name, "set_many");
                self.telemetry.record_error(self.backend_name, "set_many");
            }
        }
    }

    /// Delete multiple keys.
    ///
    /// Empty input is a no-op; failures are swallowed.
    pub async fn delete_many(&self, keys: &[&str], version: Option<u32>) {
        if keys.is_empty() {
            return;
        }

        let cache_keys: Vec<String> = keys.iter().map(|k| self.make_key(k, version)).collect();
        let span = self
            .telemetry
            .span("delete_many", self.backend_name, &self.collection);
        span.record("key_count", keys.len() as u64);

        match self
            .store
            .delete_many(&cache_keys, &self.collection)
            .instrument(span.clone())
            .await
        {
            Ok(deleted) => {
                span.record("deleted_count", deleted as u64);
                self.telemetry
                    .record_request(self.backend_name, "delete_many");
                self.telemetry
                    .record_hits(self.backend_name, "delete_many", deleted as u64);
            }
            Err(e) => {
                debug!("delete_many failed: {}", e);
                self.telemetry
                    .record_request(self.backend_name, "delete_many");
                self.telemetry
                    .record_error(self.backend_name, "delete_many");
            }
        }
    }

    /// Check whether a key holds a value (stored nulls included).
    ///
    /// `false` on failure.
    pub async fn has_key(&self, key: &str, version: Option<u32>) -> bool {
        let cache_key = self.make_key(key, version);
        let span = self
            .telemetry
            .span("has_key", self.backend_name, &self.collection);
        span.record("key", cache_key.as_str());

        match self
            .store
            .get(&cache_key, &self.collection)
            .instrument(span.clone())
            .await
        {
            Ok(result) => {
                let hit = result.is_some();
                span.record("hit", hit);
                self.telemetry.record_request(self.backend_name, "has_key");
                if hit {
                    self.telemetry.record_hit(self.backend_name, "has_key");
                } else {
                    self.telemetry.record_miss(self.backend_name, "has_key");
                }
                hit
            }
            Err(e) => {
                debug!("has_key failed for {}: {}", cache_key, e);
                self.telemetry.record_request(self.backend_name, "has_key");
                self.telemetry.record_error(self.backend_name, "has_key");
                false
            }
        }
    }

    /// Always fails.
    ///
    /// The key-value store family has no efficient "remove every key in a
    /// collection" primitive, and silently doing nothing would be a
    /// correctness hazard for callers expecting global eviction. Delete
    /// keys explicitly with [`delete_many`](Self::delete_many).
    ///
    /// # Errors
    /// `Error::Unsupported`, unconditionally.
    pub async fn clear(&self) -> Result<()> {
        Err(Error::Unsupported(
            "clear is not available for key-value cache backends; \
             delete keys explicitly with delete_many"
                .to_string(),
        ))
    }
}
