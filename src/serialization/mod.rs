//! Stored envelopes and the two-tier value codec.
//!
//! Every cached value is persisted as a [`StoredEnvelope`]: a `kind` tag and
//! a payload. The codec is structured-first with a binary fallback:
//!
//! - **Structured**: the value as a JSON document. Used whenever
//!   `serde_json` can represent the value; keeps stored data
//!   human-readable.
//! - **Binary**: a Postcard encoding of the value, hex-embedded in the
//!   payload string. Used when the structured tier fails (non-string map
//!   keys, out-of-range numbers).
//!
//! The tier is chosen per value at encode time. It is a best-effort policy,
//! not a configuration knob, and callers never observe which tier was
//! taken, only that `decode(encode(v)) == v`.
//!
//! An envelope with an unrecognized `kind` decodes to its raw payload,
//! handed to the caller verbatim. Entries written by a newer deployment
//! with additional kinds degrade to pass-through instead of erroring.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Kind tag stored with every envelope.
///
/// Serialized as a plain string (`"structured"`, `"binary"`); any other
/// string round-trips through [`EnvelopeKind::Other`] unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// Payload is the value itself as a JSON document.
    Structured,
    /// Payload is a hex-encoded Postcard byte string.
    Binary,
    /// Unrecognized kind; payload is passed through verbatim.
    Other(String),
}

impl EnvelopeKind {
    /// The string form persisted in storage.
    pub fn as_str(&self) -> &str {
        match self {
            EnvelopeKind::Structured => "structured",
            EnvelopeKind::Binary => "binary",
            EnvelopeKind::Other(s) => s,
        }
    }
}

impl Serialize for EnvelopeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EnvelopeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "structured" => EnvelopeKind::Structured,
            "binary" => EnvelopeKind::Binary,
            _ => EnvelopeKind::Other(s),
        })
    }
}

/// The unit persisted per key.
///
/// Stored by every backend as a JSON object `{"kind": ..., "payload": ...}`
/// so that entries remain decodable across adapter restarts and across
/// backends. A present envelope with a `null` payload is distinct from an
/// absent key; that distinction is what lets a stored `None` round-trip
/// instead of collapsing into a cache miss.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredEnvelope {
    /// Determines how `payload` must be decoded.
    pub kind: EnvelopeKind,
    /// Structured value, or an encoded byte string for the binary tier.
    pub payload: Value,
}

impl StoredEnvelope {
    /// Envelope holding a structured (JSON) payload.
    pub fn structured(payload: Value) -> Self {
        StoredEnvelope {
            kind: EnvelopeKind::Structured,
            payload,
        }
    }

    /// Envelope holding Postcard bytes, hex-embedded.
    pub fn binary(bytes: &[u8]) -> Self {
        StoredEnvelope {
            kind: EnvelopeKind::Binary,
            payload: Value::String(hex::encode(bytes)),
        }
    }
}

/// Serialize a value into an envelope for storage.
///
/// Tries the structured tier first, falling back to binary. Returns
/// `Error::SerializationError` only when both tiers fail.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<StoredEnvelope> {
    match serde_json::to_value(value) {
        Ok(payload) => Ok(StoredEnvelope::structured(payload)),
        Err(json_err) => {
            debug!(
                "structured serialization failed ({}), falling back to binary",
                json_err
            );
            let bytes = postcard::to_allocvec(value)
                .map_err(|e| Error::SerializationError(e.to_string()))?;
            Ok(StoredEnvelope::binary(&bytes))
        }
    }
}

/// Decode an envelope back into a value.
///
/// # Errors
///
/// `Error::DeserializationError` when the payload does not match the
/// envelope's kind or the caller's requested type.
pub fn decode<T: DeserializeOwned>(envelope: &StoredEnvelope) -> Result<T> {
    match &envelope.kind {
        EnvelopeKind::Structured => serde_json::from_value(envelope.payload.clone())
            .map_err(|e| Error::DeserializationError(e.to_string())),
        EnvelopeKind::Binary => {
            let encoded = envelope.payload.as_str().ok_or_else(|| {
                Error::DeserializationError("binary payload must be a hex string".to_string())
            })?;
            let bytes =
                hex::decode(encoded).map_err(|e| Error::DeserializationError(e.to_string()))?;
            postcard::from_bytes(&bytes).map_err(|e| Error::DeserializationError(e.to_string()))
        }
        // Last-resort compatibility: hand the raw payload to the caller.
        EnvelopeKind::Other(_) => serde_json::from_value(envelope.payload.clone())
            .map_err(|e| Error::DeserializationError(e.to_string())),
    }
}
