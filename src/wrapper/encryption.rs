//! Authenticated encryption wrapper (AES-256-GCM).
//!
//! Seals the envelope payload on the way into the inner store and opens it
//! on the way out. The envelope `kind`, the TTL, and the key are never
//! touched, so the wrapper is invisible to every adapter operation:
//! `open(seal(envelope)) == envelope` for every representable envelope.
//!
//! Sealed payloads are `base64(nonce || ciphertext)` in the envelope's
//! payload slot, where the ciphertext covers the canonical JSON bytes of
//! the original payload. A fresh 96-bit nonce is drawn per write.

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::serialization::StoredEnvelope;
use crate::store::KeyValueStore;
use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, KeyInit, Nonce};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

const NONCE_LEN: usize = 12;

/// Resolve the 32-byte encryption key at construction time.
///
/// Priority:
/// 1. Explicit key on the wrapper spec
/// 2. `CacheConfig::encryption_key`
/// 3. Derived (SHA-256) from `CacheConfig::secret`
///
/// # Errors
/// `Error::ConfigError` when no key material is available.
pub fn resolve_key(explicit: Option<&str>, config: &CacheConfig) -> Result<[u8; 32]> {
    if let Some(material) = explicit {
        return Ok(key_from_material(material));
    }
    if let Some(material) = config.encryption_key.as_deref() {
        return Ok(key_from_material(material));
    }
    if let Some(secret) = config.secret.as_deref() {
        info!("Deriving cache encryption key from process secret");
        return Ok(derive_key(secret));
    }
    Err(Error::ConfigError(
        "encryption wrapper requires key material: provide the wrapper key, \
         the encryption_key setting, or a process secret"
            .to_string(),
    ))
}

/// Interpret key material: URL-safe base64 of exactly 32 bytes is used
/// directly, anything else is hashed into a key.
fn key_from_material(material: &str) -> [u8; 32] {
    if let Ok(bytes) = URL_SAFE.decode(material) {
        if bytes.len() == 32 {
            let mut key = [0u8; 32];
            key.copy_from_slice(&bytes);
            return key;
        }
    }
    derive_key(material)
}

fn derive_key(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

/// Store wrapper encrypting every envelope payload.
///
/// Implements the full storage protocol by delegating to an inner store;
/// constructed once from configuration and immutable thereafter.
pub struct EncryptionWrapper {
    inner: Arc<dyn KeyValueStore>,
    cipher: Aes256Gcm,
}

impl EncryptionWrapper {
    /// Wrap a store with the given 256-bit key.
    pub fn new(inner: Arc<dyn KeyValueStore>, key: [u8; 32]) -> Self {
        let cipher = Aes256Gcm::new(&Key::<Aes256Gcm>::from(key));
        EncryptionWrapper { inner, cipher }
    }

    fn seal(&self, envelope: &StoredEnvelope) -> Result<StoredEnvelope> {
        let plaintext = serde_json::to_vec(&envelope.payload)
            .map_err(|e| Error::SerializationError(e.to_string()))?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_ref())
            .map_err(|_| Error::EncryptionError("AES-GCM encryption failed".to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);

        Ok(StoredEnvelope {
            kind: envelope.kind.clone(),
            payload: Value::String(URL_SAFE.encode(blob)),
        })
    }

    fn open(&self, envelope: &StoredEnvelope) -> Result<StoredEnvelope> {
        let encoded = envelope.payload.as_str().ok_or_else(|| {
            Error::DecryptionError("encrypted payload must be a string".to_string())
        })?;

        let blob = URL_SAFE
            .decode(encoded)
            .map_err(|e| Error::DecryptionError(format!("invalid ciphertext encoding: {}", e)))?;

        if blob.len() < NONCE_LEN {
            return Err(Error::DecryptionError("ciphertext too short".to_string()));
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::DecryptionError("authentication failed".to_string()))?;

        let payload: Value = serde_json::from_slice(&plaintext)
            .map_err(|e| Error::DeserializationError(e.to_string()))?;

        Ok(StoredEnvelope {
            kind: envelope.kind.clone(),
            payload,
        })
    }
}

#[async_trait]
impl KeyValueStore for EncryptionWrapper {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn get(&self, key: &str, collection: &str) -> Result<Option<StoredEnvelope>> {
        match self.inner.get(key, collection).await? {
            Some(sealed) => Ok(Some(self.open(&sealed)?)),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &str,
        value: StoredEnvelope,
        collection: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let sealed = self.seal(&value)?;
        self.inner.put(key, sealed, collection, ttl).await
    }

    async fn delete(&self, key: &str, collection: &str) -> Result<bool> {
        self.inner.delete(key, collection).await
    }

    async fn get_many(
        &self,
        keys: &[String],
        collection: &str,
    ) -> Result<Vec<Option<StoredEnvelope>>> {
        let sealed = self.inner.get_many(keys, collection).await?;
        sealed
            .into_iter()
            .map(|entry| entry.map(|envelope| self.open(&envelope)).transpose())
            .collect()
    }

    async fn put_many(
        &self,
        entries: Vec<(String, StoredEnvelope)>,
        collection: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let sealed = entries
            .into_iter()
            .map(|(key, envelope)| Ok((key, self.seal(&envelope)?)))
            .collect::<Result<Vec<_>>>()?;
        self.inner.put_many(sealed, collection, ttl).await
    }

    async fn delete_many(&self, keys: &[String], collection: &str) -> Result<usize> {
        self.inner.delete_many(keys, collection).await
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use crate::serialization::EnvelopeKind;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn test_wrapper() -> EncryptionWrapper {
        EncryptionWrapper::new(Arc::new(MemoryStore::new()), derive_key("test-secret"))
    }

    #[test]
    fn test_resolve_key_priority() {
        let config = CacheConfig {
            encryption_key: Some("configured".to_string()),
            secret: Some("secret".to_string()),
            ..Default::default()
        };

        let explicit = resolve_key(Some("explicit"), &config).unwrap();
        let configured = resolve_key(None, &config).unwrap();

        assert_eq!(explicit, derive_key("explicit"));
        assert_eq!(configured, derive_key("configured"));
        assert_ne!(explicit, configured);
    }

    #[test]
    fn test_resolve_key_falls_back_to_secret() {
        let config = CacheConfig {
            secret: Some("process-secret".to_string()),
            ..Default::default()
        };

        let key = resolve_key(None, &config).unwrap();
        assert_eq!(key, derive_key("process-secret"));
    }

    #[test]
    fn test_resolve_key_without_material_fails() {
        let config = CacheConfig::default();
        let result = resolve_key(None, &config);
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_base64_key_material_used_directly() {
        let raw = [7u8; 32];
        let material = URL_SAFE.encode(raw);
        assert_eq!(key_from_material(&material), raw);

        // Non-base64 material is derived, not rejected.
        assert_eq!(key_from_material("plain words"), derive_key("plain words"));
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let wrapper = test_wrapper();
        let envelope = StoredEnvelope::structured(json!({"user": "alice", "n": 3}));

        let sealed = wrapper.seal(&envelope).unwrap();
        assert_eq!(sealed.kind, envelope.kind);
        assert_ne!(sealed.payload, envelope.payload);

        let opened = wrapper.open(&sealed).unwrap();
        assert_eq!(opened, envelope);
    }

    #[test]
    fn test_seal_preserves_binary_kind() {
        let wrapper = test_wrapper();
        let envelope = StoredEnvelope::binary(&[1, 2, 3]);

        let sealed = wrapper.seal(&envelope).unwrap();
        assert_eq!(sealed.kind, EnvelopeKind::Binary);

        let opened = wrapper.open(&sealed).unwrap();
        assert_eq!(opened, envelope);
    }

    #[test]
    fn test_nonce_freshness() {
        let wrapper = test_wrapper();
        let envelope = StoredEnvelope::structured(json!("same"));

        let a = wrapper.seal(&envelope).unwrap();
        let b = wrapper.seal(&envelope).unwrap();
        assert_ne!(a.payload, b.payload);
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let wrapper = test_wrapper();
        let sealed = wrapper
            .seal(&StoredEnvelope::structured(json!("secret")))
            .unwrap();

        let mut blob = URL_SAFE.decode(sealed.payload.as_str().unwrap()).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xff;
        let tampered = StoredEnvelope {
            kind: sealed.kind,
            payload: Value::String(URL_SAFE.encode(blob)),
        };

        let result = wrapper.open(&tampered);
        assert!(matches!(result, Err(Error::DecryptionError(_))));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let sealer = test_wrapper();
        let opener =
            EncryptionWrapper::new(Arc::new(MemoryStore::new()), derive_key("other-secret"));

        let sealed = sealer
            .seal(&StoredEnvelope::structured(json!("secret")))
            .unwrap();
        assert!(matches!(
            opener.open(&sealed),
            Err(Error::DecryptionError(_))
        ));
    }

    #[tokio::test]
    async fn test_wrapped_store_roundtrip() {
        let inner = Arc::new(MemoryStore::new());
        let wrapper = EncryptionWrapper::new(inner.clone(), derive_key("k"));

        let envelope = StoredEnvelope::structured(json!([1, 2, 3]));
        wrapper
            .put("key", envelope.clone(), "c", None)
            .await
            .expect("Failed to put");

        // Caller-visible value is unchanged.
        let opened = wrapper.get("key", "c").await.expect("Failed to get");
        assert_eq!(opened, Some(envelope.clone()));

        // Raw stored payload is ciphertext, not the plaintext encoding.
        let raw = inner
            .get("key", "c")
            .await
            .expect("Failed to get")
            .expect("Entry missing");
        assert_ne!(raw.payload, envelope.payload);
        assert_eq!(raw.kind, envelope.kind);
    }

    #[tokio::test]
    async fn test_wrapped_store_batch_roundtrip() {
        let wrapper = test_wrapper();

        wrapper
            .put_many(
                vec![
                    ("k1".to_string(), StoredEnvelope::structured(json!(1))),
                    ("k2".to_string(), StoredEnvelope::structured(json!(2))),
                ],
                "c",
                None,
            )
            .await
            .expect("Failed to put_many");

        let keys = vec!["k1".to_string(), "k2".to_string(), "k3".to_string()];
        let results = wrapper
            .get_many(&keys, "c")
            .await
            .expect("Failed to get_many");

        assert_eq!(results[0], Some(StoredEnvelope::structured(json!(1))));
        assert_eq!(results[1], Some(StoredEnvelope::structured(json!(2))));
        assert_eq!(results[2], None);
    }
}
