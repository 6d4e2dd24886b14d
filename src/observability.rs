//! Telemetry envelope: spans and counters around cache operations.
//!
//! Every adapter operation is wrapped in a `tracing` span and feeds four
//! monotonic counters (requests, hits, misses, errors) tagged by backend
//! and operation. Telemetry never changes an operation's result: with a
//! disabled [`Telemetry`] the adapter behaves identically.
//!
//! The telemetry context is constructed explicitly by the process
//! bootstrap and handed to each adapter at build time. There is no global
//! state to initialize or reset.
//!
//! # Metrics
//!
//! Implement [`CacheMetrics`] to feed your monitoring system:
//!
//! ```
//! use cache_bridge::observability::CacheMetrics;
//!
//! struct PrometheusMetrics;
//!
//! impl CacheMetrics for PrometheusMetrics {
//!     fn add_hits(&self, _backend: &str, _operation: &str, _count: u64) {
//!         // counter!("cache_hits").increment(count);
//!     }
//!     // ... other counters
//! }
//! ```
//!
//! Default trait bodies log via the `log` crate, so a bare `impl` block is
//! a usable debugging sink. [`AtomicMetrics`] keeps in-process totals and
//! backs the test suite.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Runtime toggles for the telemetry envelope.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Master switch. Disabled telemetry records nothing.
    pub enabled: bool,
    /// Emit a span per cache operation.
    pub instrument_cache: bool,
    /// Feed the counters.
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            enabled: false,
            instrument_cache: true,
            metrics_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Configuration with everything on.
    pub fn enabled() -> Self {
        TelemetryConfig {
            enabled: true,
            ..Default::default()
        }
    }
}

/// Monotonic counters for cache operations, tagged by backend and
/// operation.
pub trait CacheMetrics: Send + Sync {
    /// Count operations issued.
    fn add_requests(&self, backend: &str, operation: &str, count: u64) {
        debug!("Cache {} {}: +{} requests", backend, operation, count);
    }

    /// Count hits.
    fn add_hits(&self, backend: &str, operation: &str, count: u64) {
        debug!("Cache {} {}: +{} hits", backend, operation, count);
    }

    /// Count misses.
    fn add_misses(&self, backend: &str, operation: &str, count: u64) {
        debug!("Cache {} {}: +{} misses", backend, operation, count);
    }

    /// Count failed operations.
    fn add_errors(&self, backend: &str, operation: &str, count: u64) {
        warn!("Cache {} {}: +{} errors", backend, operation, count);
    }
}

/// Metrics implementation that records nothing.
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn add_requests(&self, _backend: &str, _operation: &str, _count: u64) {}
    fn add_hits(&self, _backend: &str, _operation: &str, _count: u64) {}
    fn add_misses(&self, _backend: &str, _operation: &str, _count: u64) {}
    fn add_errors(&self, _backend: &str, _operation: &str, _count: u64) {}
}

/// In-process counter totals, ignoring tags. Useful in tests and for
/// quick inspection without a metrics pipeline.
#[derive(Default)]
pub struct AtomicMetrics {
    requests: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time totals from an [`AtomicMetrics`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current totals.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl CacheMetrics for AtomicMetrics {
    fn add_requests(&self, _backend: &str, _operation: &str, count: u64) {
        self.requests.fetch_add(count, Ordering::Relaxed);
    }

    fn add_hits(&self, _backend: &str, _operation: &str, count: u64) {
        self.hits.fetch_add(count, Ordering::Relaxed);
    }

    fn add_misses(&self, _backend: &str, _operation: &str, count: u64) {
        self.misses.fetch_add(count, Ordering::Relaxed);
    }

    fn add_errors(&self, _backend: &str, _operation: &str, count: u64) {
        self.errors.fetch_add(count, Ordering::Relaxed);
    }
}

/// Explicitly constructed telemetry context handed to adapters at build
/// time.
#[derive(Clone)]
pub struct Telemetry {
    config: TelemetryConfig,
    metrics: Arc<dyn CacheMetrics>,
}

impl Telemetry {
    /// Telemetry with the given configuration and metrics sink.
    pub fn new(config: TelemetryConfig, metrics: Arc<dyn CacheMetrics>) -> Self {
        Telemetry { config, metrics }
    }

    /// Telemetry that records nothing. The adapter default.
    pub fn disabled() -> Self {
        Telemetry {
            config: TelemetryConfig::default(),
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Span for one cache operation, or a disabled span when
    /// instrumentation is off.
    ///
    /// Carries `operation`, `backend`, and `collection`; the per-operation
    /// attributes (`key`, `key_count`, `hit`, `hit_count`, `miss_count`,
    /// `ttl`, `deleted`, `deleted_count`) start empty and are recorded as
    /// the operation learns them.
    pub fn span(&self, operation: &str, backend: &str, collection: &str) -> tracing::Span {
        if !(self.config.enabled && self.config.instrument_cache) {
            return tracing::Span::none();
        }
        tracing::debug_span!(
            "cache",
            operation = operation,
            backend = backend,
            collection = collection,
            key = tracing::field::Empty,
            key_count = tracing::field::Empty,
            hit = tracing::field::Empty,
            hit_count = tracing::field::Empty,
            miss_count = tracing::field::Empty,
            ttl = tracing::field::Empty,
            deleted = tracing::field::Empty,
            deleted_count = tracing::field::Empty,
        )
    }

    fn metrics_on(&self) -> bool {
        self.config.enabled && self.config.metrics_enabled
    }

    pub fn record_request(&self, backend: &str, operation: &str) {
        if self.metrics_on() {
            self.metrics.add_requests(backend, operation, 1);
        }
    }

    pub fn record_hit(&self, backend: &str, operation: &str) {
        self.record_hits(backend, operation, 1);
    }

    pub fn record_miss(&self, backend: &str, operation: &str) {
        self.record_misses(backend, operation, 1);
    }

    pub fn record_hits(&self, backend: &str, operation: &str, count: u64) {
        if self.metrics_on() && count > 0 {
            self.metrics.add_hits(backend, operation, count);
        }
    }

    pub fn record_misses(&self, backend: &str, operation: &str, count: u64) {
        if self.metrics_on() && count > 0 {
            self.metrics.add_misses(backend, operation, count);
        }
    }

    pub fn record_error(&self, backend: &str, operation: &str) {
        if self.metrics_on() {
            self.metrics.add_errors(backend, operation, 1);
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::disabled()
    }
}
