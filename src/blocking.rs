//! Blocking facade over the async adapter.
//!
//! The suspending core in [`crate::cache`] is the only implementation of
//! the operation surface; this facade owns a current-thread tokio runtime
//! and drives each operation to completion on the caller's thread. The
//! observable semantics are identical to the async entry points.

use crate::cache::KeyValueCache;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Blocking adapter over a [`KeyValueCache`].
///
/// For synchronous callers only: calling these methods from inside an
/// async runtime panics (`block_on` within a runtime). Cloning is cheap
/// and clones share the runtime and the underlying store.
///
/// # Example
///
/// ```
/// use cache_bridge::{BlockingCache, KeyValueCache, store::MemoryStore};
///
/// # fn main() -> cache_bridge::Result<()> {
/// let cache = BlockingCache::new(KeyValueCache::builder(MemoryStore::new()).build()?)?;
///
/// cache.set("greeting", "hello", None, None);
/// let value: Option<String> = cache.get("greeting", None);
/// assert_eq!(value.as_deref(), Some("hello"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BlockingCache {
    inner: KeyValueCache,
    runtime: Arc<tokio::runtime::Runtime>,
}

impl BlockingCache {
    /// Wrap an async adapter in a blocking facade.
    ///
    /// # Errors
    /// `Error::ConfigError` if the internal runtime cannot be started.
    pub fn new(inner: KeyValueCache) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::ConfigError(format!("failed to start blocking runtime: {}", e)))?;

        Ok(BlockingCache {
            inner,
            runtime: Arc::new(runtime),
        })
    }

    /// The async adapter this facade drives.
    pub fn inner(&self) -> &KeyValueCache {
        &self.inner
    }

    /// Blocking [`KeyValueCache::get`].
    pub fn get<T: DeserializeOwned>(&self, key: &str, version: Option<u32>) -> Option<T> {
        self.runtime.block_on(self.inner.get(key, version))
    }

    /// Blocking [`KeyValueCache::get_or`].
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.runtime.block_on(self.inner.get_or(key, default))
    }

    /// Blocking [`KeyValueCache::set`].
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        version: Option<u32>,
    ) {
        self.runtime.block_on(self.inner.set(key, value, ttl, version))
    }

    /// Blocking [`KeyValueCache::delete`].
    pub fn delete(&self, key: &str, version: Option<u32>) -> bool {
        self.runtime.block_on(self.inner.delete(key, version))
    }

    /// Blocking [`KeyValueCache::add`].
    ///
    /// Carries the same non-atomicity as the async `add`.
    pub fn add<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        version: Option<u32>,
    ) -> bool {
        self.runtime.block_on(self.inner.add(key, value, ttl, version))
    }

    /// Blocking [`KeyValueCache::get_many`].
    pub fn get_many<T: DeserializeOwned>(
        &self,
        keys: &[&str],
        version: Option<u32>,
    ) -> HashMap<String, T> {
        self.runtime.block_on(self.inner.get_many(keys, version))
    }

    /// Blocking [`KeyValueCache::set_many`].
    pub fn set_many<T: Serialize>(
        &self,
        data: &HashMap<String, T>,
        ttl: Option<Duration>,
        version: Option<u32>,
    ) {
        self.runtime.block_on(self.inner.set_many(data, ttl, version))
    }

    /// Blocking [`KeyValueCache::delete_many`].
    pub fn delete_many(&self, keys: &[&str], version: Option<u32>) {
        self.runtime.block_on(self.inner.delete_many(keys, version))
    }

    /// Blocking [`KeyValueCache::has_key`].
    pub fn has_key(&self, key: &str, version: Option<u32>) -> bool {
        self.runtime.block_on(self.inner.has_key(key, version))
    }

    /// Blocking [`KeyValueCache::clear`]. Always fails.
    ///
    /// # Errors
    /// `Error::Unsupported`, unconditionally.
    pub fn clear(&self) -> Result<()> {
        self.runtime.block_on(self.inner.clear())
    }
}
