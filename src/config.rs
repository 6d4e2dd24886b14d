//! Adapter configuration.
//!
//! Configuration is declarative and read once at construction. It can be
//! built in code or deserialized from a settings document; either way the
//! adapter builder validates it and fails fatally on anything malformed,
//! since a bad deployment should not boot.

use crate::error::{Error, Result};
use crate::key::CacheKeyBuilder;
use serde::Deserialize;

/// Default collection name when none is configured.
pub const DEFAULT_COLLECTION: &str = "default_cache";

/// Default key version when none is configured.
pub const DEFAULT_VERSION: u32 = 1;

/// A single entry in the wrapper chain.
///
/// Wrappers apply in declared order on write and in mirrored order on read.
/// Unknown `type` values fail at deserialization time.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WrapperSpec {
    /// Authenticated symmetric encryption of envelope payloads.
    ///
    /// `key` is optional; see `wrapper::encryption` for the resolution
    /// order when it is absent.
    Encryption {
        #[serde(default)]
        key: Option<String>,
    },
    /// Reserved. Configuring it is an error at build time, never a
    /// silent no-op.
    Compression,
}

/// Adapter configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Logical namespace passed to every storage call.
    pub collection: String,
    /// Prefix component of every fully-qualified key.
    pub key_prefix: String,
    /// Version used when an operation does not supply one.
    pub version: u32,
    /// Ordered wrapper chain applied around the store.
    pub wrappers: Vec<WrapperSpec>,
    /// Encryption key material (URL-safe base64 of 32 bytes, or any
    /// string to derive from). Consulted when a wrapper spec carries no
    /// explicit key.
    pub encryption_key: Option<String>,
    /// Process-wide secret; last resort for key derivation.
    pub secret: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            collection: DEFAULT_COLLECTION.to_string(),
            key_prefix: String::new(),
            version: DEFAULT_VERSION,
            wrappers: Vec::new(),
            encryption_key: None,
            secret: None,
        }
    }
}

impl CacheConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    /// `Error::ConfigError` for an empty collection or a key prefix
    /// containing the key separator.
    pub fn validate(&self) -> Result<()> {
        if self.collection.is_empty() {
            return Err(Error::ConfigError(
                "collection name must not be empty".to_string(),
            ));
        }
        CacheKeyBuilder::validate_prefix(&self.key_prefix)
    }
}
