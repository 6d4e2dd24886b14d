//! Error types for the cache bridge.

use std::fmt;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the cache bridge.
///
/// Configuration errors are fatal and surface at construction time; every
/// other variant is caught at the adapter boundary and converted to the
/// operation's safe result (miss, no-op, `false`, or an empty mapping).
#[derive(Debug, Clone)]
pub enum Error {
    /// Serialization failed when converting a value into a stored envelope.
    ///
    /// Raised when neither the structured tier (JSON) nor the binary
    /// fallback (postcard) can represent the value.
    SerializationError(String),

    /// Deserialization failed when converting a stored envelope back into
    /// a value.
    ///
    /// This indicates corrupted or malformed data in the backend, or a
    /// type mismatch between what was stored and what the caller asked for.
    DeserializationError(String),

    /// Backend storage error (Redis, disk, etc).
    ///
    /// The backend is unavailable or returned an error: connection lost,
    /// I/O failure, storage full, protocol error.
    BackendError(String),

    /// Configuration error during adapter or backend construction.
    ///
    /// Invalid key prefix, empty collection, unknown or unsupported
    /// wrapper type, missing encryption key material, bad connection
    /// parameters. These indicate the deployment is wrong, not a
    /// transient condition, and are never swallowed.
    ConfigError(String),

    /// Encrypting an envelope payload failed.
    EncryptionError(String),

    /// Decrypting an envelope payload failed.
    ///
    /// Wrong key, truncated ciphertext, or a tampered entry that fails
    /// authentication. The entry should be evicted.
    DecryptionError(String),

    /// Operation is permanently unsupported by this adapter.
    ///
    /// Returned by `clear`: the backend family has no efficient
    /// collection-wide eviction primitive and the adapter refuses to fake
    /// one with a linear scan.
    Unsupported(String),

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::EncryptionError(msg) => write!(f, "Encryption error: {}", msg),
            Error::DecryptionError(msg) => write!(f, "Decryption error: {}", msg),
            Error::Unsupported(msg) => write!(f, "Unsupported operation: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else if e.is_syntax() || e.is_data() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::BackendError(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::BackendError(format!("Redis error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ConfigError("missing key material".to_string());
        assert_eq!(err.to_string(), "Config error: missing key material");
    }

    #[test]
    fn test_error_from_string() {
        let err: Error = "test error".into();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn test_unsupported_display() {
        let err = Error::Unsupported("clear".to_string());
        assert_eq!(err.to_string(), "Unsupported operation: clear");
    }
}
