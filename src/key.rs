//! Cache key construction.
//!
//! Every key handed to a backend is fully qualified as
//! `{prefix}:{version}:{logical_key}`. Equal `(prefix, version, key)`
//! triples address the same slot; a difference in any component addresses a
//! disjoint slot.

use crate::error::{Error, Result};
use std::fmt::Display;

/// Separator between the prefix, version, and logical key.
pub const KEY_SEPARATOR: char = ':';

/// Builder for fully-qualified cache keys.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Build the storage key from a prefix, an integer version, and a
    /// logical key.
    ///
    /// The logical key may be any `Display` type (string, integer, UUID).
    pub fn build(prefix: &str, version: u32, key: &dyn Display) -> String {
        format!("{}{}{}{}{}", prefix, KEY_SEPARATOR, version, KEY_SEPARATOR, key)
    }

    /// Validate a key prefix for use with [`build`](Self::build).
    ///
    /// The separator may not appear inside the prefix; otherwise
    /// `("a:b", 1, "k")` and `("a", ...)` could collide.
    pub fn validate_prefix(prefix: &str) -> Result<()> {
        if prefix.contains(KEY_SEPARATOR) {
            return Err(Error::ConfigError(format!(
                "key prefix {:?} must not contain {:?}",
                prefix, KEY_SEPARATOR
            )));
        }
        Ok(())
    }
}
