//! # cache-bridge
//!
//! A pluggable cache adapter bridging a web framework's cache contract to
//! interchangeable key-value stores.
//!
//! ## Features
//!
//! - **Backend Agnostic:** In-memory, disk, Redis, and custom stores behind
//!   one storage protocol
//! - **Versioned Keys:** `{prefix}:{version}:{key}` construction with
//!   per-operation version overrides
//! - **Two-Tier Codec:** Structured (JSON) serialization with a binary
//!   (Postcard) fallback, chosen per value
//! - **Transform Wrappers:** Composable store decorators - authenticated
//!   encryption built in - transparent to every operation
//! - **Sync and Async:** One suspending core, with a thin blocking facade
//! - **Observable:** `tracing` spans and hit/miss/error counters around
//!   every operation, off by default
//!
//! ## Quick Start
//!
//! ```
//! use cache_bridge::{KeyValueCache, store::MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> cache_bridge::Result<()> {
//!     let cache = KeyValueCache::builder(MemoryStore::new())
//!         .collection("app_cache")
//!         .key_prefix("app")
//!         .build()?;
//!
//!     cache.set("user:42", &"alice", None, None).await;
//!
//!     let name: Option<String> = cache.get("user:42", None).await;
//!     assert_eq!(name.as_deref(), Some("alice"));
//!     Ok(())
//! }
//! ```
//!
//! ## Encryption
//!
//! ```
//! use cache_bridge::{KeyValueCache, WrapperSpec, store::MemoryStore};
//!
//! # fn main() -> cache_bridge::Result<()> {
//! let cache = KeyValueCache::builder(MemoryStore::new())
//!     .wrapper(WrapperSpec::Encryption { key: None })
//!     .secret("process-wide-secret")
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure model
//!
//! Configuration problems (bad prefix, unknown wrapper, missing key
//! material) fail at build time. At operation time the adapter never
//! raises: backend and codec failures are recorded through telemetry and
//! collapse to the safe result - miss, no-op, `false`, or empty mapping.
//! The single designed exception is [`KeyValueCache::clear`], which always
//! returns [`Error::Unsupported`].

#[macro_use]
extern crate log;

pub mod blocking;
pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod observability;
pub mod serialization;
pub mod store;
pub mod wrapper;

// Re-exports for convenience
pub use blocking::BlockingCache;
pub use cache::{KeyValueCache, KeyValueCacheBuilder};
pub use config::{CacheConfig, WrapperSpec};
pub use error::{Error, Result};
pub use observability::{CacheMetrics, Telemetry, TelemetryConfig};
pub use serialization::{EnvelopeKind, StoredEnvelope};
pub use store::KeyValueStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
