//! The resilient batched cache client.
//!
//! [`ClusterClient`] turns arbitrary-length multi-get/multi-put requests
//! into bounded, retried wire operations against a fixed set of cache
//! servers, and hands back one result per input key in input order.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    ClusterClient                        │
//! │                                                        │
//! │  multi_get: slice into sub-batches ≤ batch size cap    │
//! │  multi_put: one set per entry                          │
//! │  retry loop per sub-batch / write (retry.rs)           │
//! └──────────┬─────────────────────────────────────────────┘
//!            │ route(key) picks the owning node
//!            ▼
//! ┌──────────────────┐  ┌──────────────────┐
//! │ Node cache-1     │  │ Node cache-2     │   ... one per endpoint
//! │ HostLimiter      │  │ HostLimiter      │
//! │ dyn CacheTransport│ │ dyn CacheTransport│
//! └──────────────────┘  └──────────────────┘
//! ```
//!
//! Concurrency is bounded only by the per-endpoint limiters; sub-batches
//! and writes dispatch concurrently and recompose in order. Failures stay
//! per-key: one sub-batch exhausting its retries fills its own slots with
//! the error and leaves every other sub-batch alone.

mod endpoint;
mod error;
mod limiter;
mod memory;
mod retry;
mod router;
mod transport;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::timeout;

pub use endpoint::Endpoint;
pub use error::ClientError;
pub use limiter::{HostLimiter, SlotPermit};
pub use memory::InMemoryTransport;
pub use router::{KeyRouter, Xxh64Router};
pub use transport::{BoxFuture, CacheTransport};

use retry::{run_attempts, RetryBudget};

use crate::metrics::StateMetrics;
use crate::options::StateOptions;

/// One cache server: its address, transport and admission control.
struct Node {
    endpoint: Endpoint,
    transport: Arc<dyn CacheTransport>,
    limiter: HostLimiter,
}

/// Batched, fault-tolerant client for a cluster of cache servers.
///
/// The endpoint list is fixed at construction. The client is cheap to share
/// behind an `Arc`; it keeps no per-call state.
pub struct ClusterClient {
    nodes: Vec<Node>,
    router: Arc<dyn KeyRouter>,
    options: StateOptions,
    metrics: Arc<StateMetrics>,
}

impl ClusterClient {
    /// Create a client over `servers` with the default xxh64 router.
    ///
    /// Each server pairs an endpoint with the transport speaking its wire
    /// protocol.
    pub fn new(
        servers: Vec<(Endpoint, Arc<dyn CacheTransport>)>,
        options: StateOptions,
        metrics: Arc<StateMetrics>,
    ) -> Self {
        Self::with_router(servers, Arc::new(Xxh64Router), options, metrics)
    }

    /// Create a client with a custom placement scheme.
    pub fn with_router(
        servers: Vec<(Endpoint, Arc<dyn CacheTransport>)>,
        router: Arc<dyn KeyRouter>,
        options: StateOptions,
        metrics: Arc<StateMetrics>,
    ) -> Self {
        assert!(!servers.is_empty(), "at least one endpoint is required");

        let nodes = servers
            .into_iter()
            .map(|(endpoint, transport)| Node {
                limiter: HostLimiter::new(
                    endpoint.clone(),
                    options.host_connection_limit,
                    options.max_waiters,
                ),
                endpoint,
                transport,
            })
            .collect();

        Self {
            nodes,
            router,
            options,
            metrics,
        }
    }

    /// Create a client over in-process stores, one per endpoint.
    ///
    /// For tests and local development; see
    /// [`InMemoryTransport`].
    pub fn in_memory(
        endpoints: Vec<Endpoint>,
        options: StateOptions,
        metrics: Arc<StateMetrics>,
    ) -> Self {
        let servers = endpoints
            .into_iter()
            .map(|endpoint| {
                let transport: Arc<dyn CacheTransport> = Arc::new(InMemoryTransport::new());
                (endpoint, transport)
            })
            .collect();
        Self::new(servers, options, metrics)
    }

    /// The metrics this client reports into.
    pub fn metrics(&self) -> &Arc<StateMetrics> {
        &self.metrics
    }

    /// The options this client runs under.
    pub fn options(&self) -> &StateOptions {
        &self.options
    }

    /// Fetch payloads for `keys`, one result per key in input order.
    ///
    /// Keys are sliced into contiguous sub-batches no larger than the
    /// configured cap, never reordered or deduplicated. Sub-batches
    /// dispatch concurrently; each one retries as a unit under its own
    /// end-to-end budget, and on exhaustion fails all of its keys while
    /// the rest of the call proceeds.
    ///
    /// Absent keys come back as `Ok(None)`, never as an error.
    pub async fn multi_get(&self, keys: Vec<String>) -> Vec<Result<Option<Vec<u8>>, ClientError>> {
        if keys.is_empty() {
            return Vec::new();
        }

        let batch_size = self.options.max_multi_get_batch_size.max(1);
        let sub_batches = keys
            .chunks(batch_size)
            .map(|sub_batch| self.fetch_sub_batch(sub_batch));

        join_all(sub_batches).await.into_iter().flatten().collect()
    }

    /// Store `entries`, one result per entry in input order.
    ///
    /// Writes are independent single-key sets: they dispatch concurrently,
    /// retry individually, and one entry's failure never blocks the others.
    /// Every write carries `ttl` (`None` writes without expiry).
    pub async fn multi_put(
        &self,
        entries: Vec<(String, Vec<u8>)>,
        ttl: Option<Duration>,
    ) -> Vec<Result<(), ClientError>> {
        let writes = entries
            .into_iter()
            .map(|(key, value)| self.store_one(key, value, ttl));
        join_all(writes).await
    }

    /// Run one sub-batch to completion and spread the result over its keys.
    async fn fetch_sub_batch(
        &self,
        sub_batch: &[String],
    ) -> Vec<Result<Option<Vec<u8>>, ClientError>> {
        let outcome = run_attempts(
            self.retry_budget(),
            &self.metrics,
            "multi_get",
            || self.fetch_once(sub_batch),
        )
        .await;

        match outcome {
            // get, not remove: duplicate keys in a sub-batch each resolve
            Ok(found) => sub_batch
                .iter()
                .map(|key| Ok(found.get(key).cloned()))
                .collect(),
            Err(err) => sub_batch.iter().map(|_| Err(err.clone())).collect(),
        }
    }

    /// One attempt at a sub-batch: group keys by owner, bulk-get each
    /// group, merge. Any group's failure fails the attempt.
    async fn fetch_once(
        &self,
        sub_batch: &[String],
    ) -> Result<HashMap<String, Vec<u8>>, ClientError> {
        let mut groups: Vec<Vec<String>> = vec![Vec::new(); self.nodes.len()];
        for key in sub_batch {
            groups[self.router.route(key, self.nodes.len())].push(key.clone());
        }

        let dispatches = groups
            .into_iter()
            .enumerate()
            .filter(|(_, group)| !group.is_empty())
            .map(|(index, group)| self.node_bulk_get(&self.nodes[index], group));

        let mut found = HashMap::with_capacity(sub_batch.len());
        for result in join_all(dispatches).await {
            found.extend(result?);
        }
        Ok(found)
    }

    /// One bulk-get against one node, under its admission control and the
    /// connect/request timeouts.
    async fn node_bulk_get(
        &self,
        node: &Node,
        group: Vec<String>,
    ) -> Result<HashMap<String, Vec<u8>>, ClientError> {
        let _slot = node.limiter.acquire().await?;

        timeout(self.options.connect_timeout, node.transport.connect())
            .await
            .map_err(|_| ClientError::ConnectTimeout {
                endpoint: node.endpoint.clone(),
                timeout: self.options.connect_timeout,
            })??;

        timeout(self.options.request_timeout, node.transport.bulk_get(group))
            .await
            .map_err(|_| ClientError::RequestTimeout {
                endpoint: node.endpoint.clone(),
                timeout: self.options.request_timeout,
            })?
    }

    /// Write one entry to its owning node, retrying under the budget.
    async fn store_one(
        &self,
        key: String,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), ClientError> {
        let node = &self.nodes[self.router.route(&key, self.nodes.len())];
        run_attempts(self.retry_budget(), &self.metrics, "put", || {
            self.node_set(node, key.clone(), value.clone(), ttl)
        })
        .await
    }

    /// One set against one node, under its admission control and the
    /// connect/request timeouts.
    async fn node_set(
        &self,
        node: &Node,
        key: String,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), ClientError> {
        let _slot = node.limiter.acquire().await?;

        timeout(self.options.connect_timeout, node.transport.connect())
            .await
            .map_err(|_| ClientError::ConnectTimeout {
                endpoint: node.endpoint.clone(),
                timeout: self.options.connect_timeout,
            })??;

        timeout(
            self.options.request_timeout,
            node.transport.set(key, value, ttl),
        )
        .await
        .map_err(|_| ClientError::RequestTimeout {
            endpoint: node.endpoint.clone(),
            timeout: self.options.request_timeout,
        })?
    }

    fn retry_budget(&self) -> RetryBudget {
        RetryBudget {
            retries: self.options.request_retries,
            e2e_timeout: self.options.e2e_timeout,
        }
    }
}
