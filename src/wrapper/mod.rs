//! Transform wrappers over the storage protocol.
//!
//! A wrapper is a store that owns an inner store and transforms envelope
//! payloads on the way in and out, leaving the protocol contract intact.
//! The chain is built once from the declarative wrapper list at adapter
//! construction and is immutable afterwards.

use crate::config::{CacheConfig, WrapperSpec};
use crate::error::{Error, Result};
use crate::store::KeyValueStore;
use std::sync::Arc;

pub mod encryption;

pub use encryption::EncryptionWrapper;

/// Apply the configured wrapper chain to a store.
///
/// Wrappers wrap outward in declared order, so the first entry in the list
/// is applied first on write and last on read.
///
/// # Errors
/// `Error::ConfigError` for the reserved `compression` wrapper or missing
/// encryption key material.
pub fn apply_wrappers(
    store: Arc<dyn KeyValueStore>,
    config: &CacheConfig,
) -> Result<Arc<dyn KeyValueStore>> {
    // The first declared wrapper must transform first on write, so it
    // wraps outermost: iterate inside-out.
    let mut store = store;
    for spec in config.wrappers.iter().rev() {
        store = match spec {
            WrapperSpec::Encryption { key } => {
                let key = encryption::resolve_key(key.as_deref(), config)?;
                Arc::new(EncryptionWrapper::new(store, key))
            }
            WrapperSpec::Compression => {
                return Err(Error::ConfigError(
                    "unsupported wrapper type: compression is reserved but not implemented"
                        .to_string(),
                ));
            }
        };
    }
    Ok(store)
}
