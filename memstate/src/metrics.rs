//! Lock-free counters for reads, writes and exceptions.
//!
//! Counters are registered explicitly by name on a [`MetricsRegistry`] that
//! the process owns; nothing here reaches into ambient global state. The
//! registry hands out cheap [`CounterHandle`] clones that share one atomic,
//! so instrumentation from any number of concurrent calls is a single
//! `fetch_add`.
//!
//! # Architecture
//!
//! ```text
//! Batched client / facade ───► StateMetrics ───► MetricsRegistry::snapshot()
//!                              (atomic counters)  (export to any backend)
//! ```
//!
//! This core only ever increments; reading the counters back is for the
//! process's metrics exporter (and tests).

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Registry name of the read counter.
pub const READ_COUNT: &str = "memcached/readCount";

/// Registry name of the write counter.
pub const WRITE_COUNT: &str = "memcached/writeCount";

/// Registry name of the exception counter.
pub const EXCEPTION_COUNT: &str = "memcached/exceptionCount";

/// A monotonic counter shared by name.
///
/// Clones share the same underlying atomic.
#[derive(Clone, Default)]
pub struct CounterHandle {
    count: Arc<AtomicU64>,
}

impl CounterHandle {
    /// Add one.
    pub fn incr(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Add `n`.
    pub fn incr_by(&self, n: u64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    /// Current value.
    pub fn value(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for CounterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CounterHandle").field(&self.value()).finish()
    }
}

/// Process-local registry of named counters.
///
/// `counter()` returns the existing handle for a name or creates one, so
/// every component registering the same name shares the same atomic.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: Mutex<HashMap<String, CounterHandle>>,
}

impl MetricsRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the counter registered under `name`.
    pub fn counter(&self, name: &str) -> CounterHandle {
        self.counters
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    /// Point-in-time copy of every registered counter, for export.
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.counters
            .lock()
            .unwrap()
            .iter()
            .map(|(name, handle)| (name.clone(), handle.value()))
            .collect()
    }
}

/// The three counters this backend maintains.
///
/// - reads: result slots produced by completed `multi_get` calls (absent
///   entries count too)
/// - writes: values successfully written by `multi_put`
/// - exceptions: failed attempts, one tick per attempt including each
///   retry, whether or not the operation eventually succeeds
#[derive(Debug, Clone)]
pub struct StateMetrics {
    reads: CounterHandle,
    writes: CounterHandle,
    exceptions: CounterHandle,
}

impl StateMetrics {
    /// Register the three counters on `registry` under their wire names.
    pub fn register(registry: &MetricsRegistry) -> Self {
        Self {
            reads: registry.counter(READ_COUNT),
            writes: registry.counter(WRITE_COUNT),
            exceptions: registry.counter(EXCEPTION_COUNT),
        }
    }

    /// Standalone counters not attached to any registry.
    ///
    /// Handy when the process does not export metrics.
    pub fn unregistered() -> Self {
        Self {
            reads: CounterHandle::default(),
            writes: CounterHandle::default(),
            exceptions: CounterHandle::default(),
        }
    }

    /// Record `n` read result slots.
    pub(crate) fn read_batch(&self, n: u64) {
        self.reads.incr_by(n);
    }

    /// Record `n` completed writes.
    pub(crate) fn wrote_batch(&self, n: u64) {
        self.writes.incr_by(n);
    }

    /// Record one failed attempt.
    pub(crate) fn exception(&self) {
        self.exceptions.incr();
    }

    /// Total read result slots so far.
    pub fn reads(&self) -> u64 {
        self.reads.value()
    }

    /// Total completed writes so far.
    pub fn writes(&self) -> u64 {
        self.writes.value()
    }

    /// Total failed attempts so far.
    pub fn exceptions(&self) -> u64 {
        self.exceptions.value()
    }
}
