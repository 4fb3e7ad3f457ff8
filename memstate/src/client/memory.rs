//! In-memory transport backed by moka.
//!
//! Stands in for one cache server in tests and local development: the same
//! bulk-get/set surface, per-entry time-to-live honored, LRU eviction when
//! the store outgrows its capacity. Never fails and connects instantly,
//! which keeps it out of the way when exercising the retry and batching
//! machinery with the failure-injecting test transports.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use moka::future::Cache as MokaCache;
use moka::Expiry;

use super::error::ClientError;
use super::transport::{BoxFuture, CacheTransport};

/// Default store capacity in bytes.
const DEFAULT_MAX_BYTES: u64 = 256 * 1024 * 1024;

/// One stored entry with the TTL it was written under.
#[derive(Clone)]
struct StoredEntry {
    data: Vec<u8>,
    ttl: Option<Duration>,
}

/// Expires each entry according to the TTL its write carried.
struct PerEntryTtl;

impl Expiry<String, StoredEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &StoredEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &StoredEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        // Overwrites take the new write's TTL, not the old one's remainder.
        entry.ttl
    }
}

/// An in-process cache server.
pub struct InMemoryTransport {
    store: MokaCache<String, StoredEntry>,
}

impl InMemoryTransport {
    /// Create a store with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_BYTES)
    }

    /// Create a store bounded to `max_bytes` of entry data.
    pub fn with_capacity(max_bytes: u64) -> Self {
        let store = MokaCache::builder()
            // Weight each entry by its payload size
            .weigher(|_key: &String, entry: &StoredEntry| -> u32 {
                entry.data.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_bytes)
            .expire_after(PerEntryTtl)
            .build();

        Self { store }
    }

    /// Number of live entries.
    ///
    /// Moka maintains this lazily; call [`Self::sync`] first when an exact
    /// count matters.
    pub fn entry_count(&self) -> u64 {
        self.store.entry_count()
    }

    /// Run pending maintenance (eviction, expiry) so counts are exact.
    pub async fn sync(&self) {
        self.store.run_pending_tasks().await;
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheTransport for InMemoryTransport {
    fn connect(&self) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async { Ok(()) })
    }

    fn bulk_get(
        &self,
        keys: Vec<String>,
    ) -> BoxFuture<'_, Result<HashMap<String, Vec<u8>>, ClientError>> {
        Box::pin(async move {
            let mut found = HashMap::with_capacity(keys.len());
            for key in keys {
                if let Some(entry) = self.store.get(&key).await {
                    found.insert(key, entry.data);
                }
            }
            Ok(found)
        })
    }

    fn set(
        &self,
        key: String,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            self.store.insert(key, StoredEntry { data: value, ttl }).await;
            Ok(())
        })
    }
}
