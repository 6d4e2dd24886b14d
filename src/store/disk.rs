//! Disk-backed store.
//!
//! One directory per collection, one JSON record file per key. Records carry
//! their own expiry deadline, so entries written by one process remain
//! decodable (and expirable) after a restart pointed at the same directory.
//! File and directory names are SHA-256 hashes of the key/collection, which
//! keeps arbitrary key strings filesystem-safe; the original key is kept
//! inside the record.
//!
//! All filesystem work runs on the blocking thread pool.

use super::KeyValueStore;
use crate::error::{Error, Result};
use crate::serialization::StoredEnvelope;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Configuration for the disk store.
#[derive(Clone, Debug)]
pub struct DiskConfig {
    /// Root directory for all collections. Created if missing.
    pub directory: PathBuf,
    /// Optional cap on the total size of stored records. When exceeded,
    /// the oldest-modified records are evicted until the store fits.
    pub max_bytes: Option<u64>,
}

impl DiskConfig {
    /// Configuration with the given root directory and no size cap.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        DiskConfig {
            directory: directory.into(),
            max_bytes: None,
        }
    }

    /// Set the total size cap in bytes.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }
}

/// On-disk record layout. Serialized as JSON so entries stay inspectable
/// and decodable across restarts.
#[derive(Serialize, Deserialize)]
struct DiskRecord {
    key: String,
    expires_at_ms: Option<u64>,
    envelope: StoredEnvelope,
}

impl DiskRecord {
    fn is_expired(&self) -> bool {
        self.expires_at_ms.is_some_and(|deadline| now_ms() > deadline)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn hashed_name(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// File-per-key store rooted at a directory.
///
/// # Example
///
/// ```no_run
/// use cache_bridge::store::{DiskConfig, DiskStore};
///
/// # fn main() -> cache_bridge::Result<()> {
/// let store = DiskStore::new(DiskConfig::new("/var/cache/app").with_max_bytes(64 * 1024 * 1024))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DiskStore {
    root: Arc<PathBuf>,
    max_bytes: Option<u64>,
}

impl DiskStore {
    /// Create a disk store, creating the root directory if needed.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if the directory cannot be created.
    pub fn new(config: DiskConfig) -> Result<Self> {
        fs::create_dir_all(&config.directory).map_err(|e| {
            Error::ConfigError(format!(
                "cannot create cache directory {}: {}",
                config.directory.display(),
                e
            ))
        })?;

        info!("✓ Disk store initialized: {}", config.directory.display());

        Ok(DiskStore {
            root: Arc::new(config.directory),
            max_bytes: config.max_bytes,
        })
    }

    fn record_path(root: &Path, collection: &str, key: &str) -> PathBuf {
        root.join(hashed_name(collection))
            .join(format!("{}.json", hashed_name(key)))
    }

    fn read_record(path: &Path) -> Result<Option<DiskRecord>> {
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::BackendError(e.to_string())),
        };

        let record: DiskRecord = serde_json::from_str(&contents)
            .map_err(|e| Error::DeserializationError(e.to_string()))?;

        if record.is_expired() {
            let _ = fs::remove_file(path);
            return Ok(None);
        }

        Ok(Some(record))
    }

    fn write_record(path: &Path, record: &DiskRecord) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::BackendError(e.to_string()))?;
        }

        let contents =
            serde_json::to_vec(record).map_err(|e| Error::SerializationError(e.to_string()))?;

        // Write-then-rename so readers never observe a partial record.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, contents).map_err(|e| Error::BackendError(e.to_string()))?;
        fs::rename(&tmp, path).map_err(|e| Error::BackendError(e.to_string()))?;
        Ok(())
    }

    /// Evict oldest-modified records until the store fits under `max_bytes`.
    fn enforce_cap(root: &Path, max_bytes: u64) -> Result<()> {
        let mut files: Vec<(PathBuf, SystemTime, u64)> = Vec::new();
        let mut total: u64 = 0;

        let collections = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::BackendError(e.to_string())),
        };

        for collection in collections.flatten() {
            let entries = match fs::read_dir(collection.path()) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                if let Ok(meta) = entry.metadata() {
                    if meta.is_file() {
                        let modified = meta.modified().unwrap_or(UNIX_EPOCH);
                        total += meta.len();
                        files.push((entry.path(), modified, meta.len()));
                    }
                }
            }
        }

        if total <= max_bytes {
            return Ok(());
        }

        files.sort_by_key(|(_, modified, _)| *modified);
        for (path, _, size) in files {
            if total <= max_bytes {
                break;
            }
            if fs::remove_file(&path).is_ok() {
                total = total.saturating_sub(size);
                debug!("✓ Disk evicted {} (size cap)", path.display());
            }
        }

        Ok(())
    }

    async fn run_blocking<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T> + Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || job(&root))
            .await
            .map_err(|e| Error::BackendError(format!("blocking task failed: {}", e)))?
    }
}

#[async_trait]
impl KeyValueStore for DiskStore {
    fn name(&self) -> &'static str {
        "disk"
    }

    async fn get(&self, key: &str, collection: &str) -> Result<Option<StoredEnvelope>> {
        let (key, collection) = (key.to_string(), collection.to_string());
        self.run_blocking(move |root| {
            let path = Self::record_path(root, &collection, &key);
            let record = Self::read_record(&path)?;
            debug!(
                "✓ Disk GET {}/{} -> {}",
                collection,
                key,
                if record.is_some() { "HIT" } else { "MISS" }
            );
            Ok(record.map(|r| r.envelope))
        })
        .await
    }

    async fn put(
        &self,
        key: &str,
        value: StoredEnvelope,
        collection: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let (key, collection) = (key.to_string(), collection.to_string());
        let max_bytes = self.max_bytes;
        self.run_blocking(move |root| {
            let record = DiskRecord {
                key: key.clone(),
                expires_at_ms: ttl.map(|d| now_ms() + d.as_millis() as u64),
                envelope: value,
            };
            let path = Self::record_path(root, &collection, &key);
            Self::write_record(&path, &record)?;
            debug!("✓ Disk PUT {}/{}", collection, key);

            if let Some(cap) = max_bytes {
                Self::enforce_cap(root, cap)?;
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str, collection: &str) -> Result<bool> {
        let (key, collection) = (key.to_string(), collection.to_string());
        self.run_blocking(move |root| {
            let path = Self::record_path(root, &collection, &key);
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("✓ Disk DELETE {}/{} -> true", collection, key);
                    Ok(true)
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(Error::BackendError(e.to_string())),
            }
        })
        .await
    }

    async fn get_many(
        &self,
        keys: &[String],
        collection: &str,
    ) -> Result<Vec<Option<StoredEnvelope>>> {
        let keys = keys.to_vec();
        let collection = collection.to_string();
        self.run_blocking(move |root| {
            let mut results = Vec::with_capacity(keys.len());
            for key in &keys {
                let path = Self::record_path(root, &collection, key);
                results.push(Self::read_record(&path)?.map(|r| r.envelope));
            }
            debug!("✓ Disk GET_MANY {} keys in {}", keys.len(), collection);
            Ok(results)
        })
        .await
    }

    async fn delete_many(&self, keys: &[String], collection: &str) -> Result<usize> {
        let keys = keys.to_vec();
        let collection = collection.to_string();
        self.run_blocking(move |root| {
            let mut removed = 0;
            for key in &keys {
                let path = Self::record_path(root, &collection, key);
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(Error::BackendError(e.to_string())),
                }
            }
            debug!(
                "✓ Disk DELETE_MANY {} keys in {} -> {} removed",
                keys.len(),
                collection,
                removed
            );
            Ok(removed)
        })
        .await
    }
}
