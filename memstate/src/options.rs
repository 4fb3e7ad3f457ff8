//! Tunables for the batched cache client.
//!
//! One immutable [`StateOptions`] is set at construction and shared
//! read-only by every concurrent operation. Every limit and timeout here is
//! load-bearing: the client enforces all of them end-to-end.

use std::time::Duration;

/// Default number of entries the framework's local read-through cache holds.
pub const DEFAULT_LOCAL_CACHE_SIZE: usize = 1000;

/// Default snapshot key used by the framework's global-state wrapper.
pub const DEFAULT_GLOBAL_KEY: &str = "$GLOBAL$";

/// Configuration for a cache-cluster state backend.
///
/// Defaults follow long-standing production settings: small request
/// timeouts with a couple of retries inside a half-second end-to-end
/// budget, ten connections per host with a short admission queue.
#[derive(Debug, Clone)]
pub struct StateOptions {
    /// Entry count hint for the enclosing framework's local read-through
    /// cache. Passed through; never read by this client.
    pub local_cache_size: usize,

    /// Snapshot key for the enclosing framework's global-state wrapper.
    /// Passed through; never read by this client.
    pub global_key: String,

    /// Time-to-live applied to every write. `None` writes without expiry.
    pub expiration: Option<Duration>,

    /// Max retry attempts after the first failure, per sub-batch or write.
    pub request_retries: u32,

    /// Max time to establish a connection once a slot is held.
    pub connect_timeout: Duration,

    /// Max time for one wire request/response.
    pub request_timeout: Duration,

    /// Max total time for a single sub-batch or write, retries included.
    pub e2e_timeout: Duration,

    /// Max concurrent in-flight requests per endpoint.
    pub host_connection_limit: usize,

    /// Max callers queued per endpoint beyond the connection limit.
    /// Anyone past this fails immediately instead of waiting.
    pub max_waiters: usize,

    /// Largest number of keys sent in one bulk-get.
    pub max_multi_get_batch_size: usize,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            local_cache_size: DEFAULT_LOCAL_CACHE_SIZE,
            global_key: DEFAULT_GLOBAL_KEY.to_string(),
            expiration: None,
            request_retries: 2,
            connect_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_millis(50),
            e2e_timeout: Duration::from_millis(500),
            host_connection_limit: 10,
            max_waiters: 2,
            max_multi_get_batch_size: 100,
        }
    }
}

impl StateOptions {
    /// Set the write time-to-live.
    pub fn with_expiration(mut self, ttl: Duration) -> Self {
        self.expiration = Some(ttl);
        self
    }

    /// Set the retry budget (attempts after the first failure).
    pub fn with_request_retries(mut self, retries: u32) -> Self {
        self.request_retries = retries;
        self
    }

    /// Set connect, request and end-to-end timeouts together.
    pub fn with_timeouts(mut self, connect: Duration, request: Duration, e2e: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self.e2e_timeout = e2e;
        self
    }

    /// Set the per-endpoint connection limit.
    pub fn with_host_connection_limit(mut self, limit: usize) -> Self {
        self.host_connection_limit = limit;
        self
    }

    /// Set the per-endpoint waiter cap.
    pub fn with_max_waiters(mut self, max_waiters: usize) -> Self {
        self.max_waiters = max_waiters;
        self
    }

    /// Set the bulk-get sub-batch size cap.
    pub fn with_max_multi_get_batch_size(mut self, size: usize) -> Self {
        self.max_multi_get_batch_size = size;
        self
    }
}
