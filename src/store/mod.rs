//! Key-value store implementations.

use crate::error::Result;
use crate::serialization::StoredEnvelope;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "disk")]
pub mod disk;
#[cfg(feature = "inmemory")]
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "disk")]
pub use disk::{DiskConfig, DiskStore};
#[cfg(feature = "inmemory")]
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis::{PoolStats, RedisConfig, RedisStore};

/// The storage protocol every backend and every wrapper must satisfy.
///
/// Operations are scoped by `(key, collection)`: two callers using different
/// collection names against the same store instance never observe each
/// other's keys, even when their keys collide.
///
/// Absence is `Ok(None)`, distinct from a stored envelope whose payload is
/// null: "no value" is carried by both the protocol layer and the envelope.
///
/// **IMPORTANT:** All methods take `&self` to allow concurrent access.
/// Implementations use interior mutability or external storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Backend label used in telemetry attributes.
    fn name(&self) -> &'static str;

    /// Retrieve the envelope stored under a key.
    ///
    /// # Returns
    /// - `Ok(Some(envelope))` - value found
    /// - `Ok(None)` - key not present (or expired)
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs (connection lost, etc.)
    async fn get(&self, key: &str, collection: &str) -> Result<Option<StoredEnvelope>>;

    /// Store an envelope under a key with an optional TTL.
    ///
    /// `ttl: None` means the entry never expires.
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs
    async fn put(
        &self,
        key: &str,
        value: StoredEnvelope,
        collection: &str,
        ttl: Option<Duration>,
    ) -> Result<()>;

    /// Remove a key.
    ///
    /// # Returns
    /// `true` iff a key was actually removed.
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs
    async fn delete(&self, key: &str, collection: &str) -> Result<bool>;

    /// Bulk get. Result has the same length and order as `keys`.
    ///
    /// Keys are independent; no cross-key ordering is guaranteed. Default
    /// implementation calls `get` per key; override for batch efficiency
    /// (e.g. Redis MGET).
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs
    async fn get_many(
        &self,
        keys: &[String],
        collection: &str,
    ) -> Result<Vec<Option<StoredEnvelope>>> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(self.get(key, collection).await?);
        }
        Ok(results)
    }

    /// Bulk put with a shared TTL.
    ///
    /// Default implementation calls `put` per entry. Not atomic: a failure
    /// part-way may leave earlier entries written.
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs
    async fn put_many(
        &self,
        entries: Vec<(String, StoredEnvelope)>,
        collection: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        for (key, value) in entries {
            self.put(&key, value, collection, ttl).await?;
        }
        Ok(())
    }

    /// Bulk delete.
    ///
    /// # Returns
    /// The number of keys actually removed.
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs
    async fn delete_many(&self, keys: &[String], collection: &str) -> Result<usize> {
        let mut removed = 0;
        for key in keys {
            if self.delete(key, collection).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Declarative backend selection.
///
/// Maps a configuration key to a concrete store constructor at startup -
/// there is no runtime reflection, and a backend whose Cargo feature is
/// disabled is an unknown key at parse time.
///
/// ```json
/// {"backend": "disk", "directory": "/var/cache/app", "max_bytes": 67108864}
/// ```
#[cfg(any(feature = "inmemory", feature = "disk", feature = "redis"))]
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum BackendConfig {
    /// In-memory store.
    #[cfg(feature = "inmemory")]
    Memory,
    /// Disk store rooted at `directory`.
    #[cfg(feature = "disk")]
    Disk {
        directory: std::path::PathBuf,
        #[serde(default)]
        max_bytes: Option<u64>,
    },
    /// Redis store. Omitted fields take the [`RedisConfig`] defaults.
    #[cfg(feature = "redis")]
    Redis {
        #[serde(default = "default_redis_host")]
        host: String,
        #[serde(default = "default_redis_port")]
        port: u16,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        database: u32,
    },
}

#[cfg(feature = "redis")]
fn default_redis_host() -> String {
    "localhost".to_string()
}

#[cfg(feature = "redis")]
fn default_redis_port() -> u16 {
    6379
}

/// Construct a store from its declarative configuration.
///
/// # Errors
/// Returns `Error::ConfigError` when the selected backend cannot be
/// initialized (bad directory, bad connection parameters).
#[cfg(any(feature = "inmemory", feature = "disk", feature = "redis"))]
pub fn from_config(config: &BackendConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config {
        #[cfg(feature = "inmemory")]
        BackendConfig::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "disk")]
        BackendConfig::Disk {
            directory,
            max_bytes,
        } => {
            let mut disk = DiskConfig::new(directory.clone());
            disk.max_bytes = *max_bytes;
            Ok(Arc::new(DiskStore::new(disk)?))
        }
        #[cfg(feature = "redis")]
        BackendConfig::Redis {
            host,
            port,
            username,
            password,
            database,
        } => {
            let redis = RedisConfig {
                host: host.clone(),
                port: *port,
                username: username.clone(),
                password: password.clone(),
                database: *database,
                ..RedisConfig::default()
            };
            Ok(Arc::new(RedisStore::new(redis)?))
        }
    }
}
