//! MemState - batched, fault-tolerant cache-cluster state for stream pipelines.
//!
//! This library lets a stream-processing framework keep its key/value state
//! in a cluster of external cache servers. The framework supplies the map
//! semantics (read-through caching, transactional and opaque merges,
//! snapshots); this crate supplies the resilient client underneath:
//! batching, per-endpoint admission control, layered timeouts, bounded
//! retries, and the codec boundary between typed values and wire payloads.
//!
//! # Architecture
//!
//! ```text
//! Stream framework ──► CacheMapState<T>      (state: typed facade, metrics)
//!                          │  compound key → flat key (key)
//!                          │  value ⇄ bytes          (codec)
//!                          ▼
//!                      ClusterClient          (client: sub-batches, retries)
//!                          │  per-endpoint HostLimiter + timeouts
//!                          ▼
//!                      dyn CacheTransport     (wire protocol, pluggable)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use memstate::{
//!     CacheMapState, ClusterClient, CompoundKey, Endpoint, MetricsRegistry,
//!     StateMetrics, StateOptions,
//! };
//!
//! let registry = MetricsRegistry::new();
//! let metrics = Arc::new(StateMetrics::register(&registry));
//! let client = Arc::new(ClusterClient::in_memory(
//!     vec![Endpoint::new("cache-1", 11211), Endpoint::new("cache-2", 11211)],
//!     StateOptions::default(),
//!     metrics,
//! ));
//! let state: CacheMapState<String> = CacheMapState::non_transactional(client);
//!
//! let keys = vec![CompoundKey::single("user:42")];
//! state.multi_put(&keys, &["hello".to_string()]).await?;
//! let values = state.multi_get(&keys).await?;
//! ```

pub mod client;
pub mod codec;
pub mod key;
pub mod metrics;
pub mod options;
pub mod state;

pub use client::{
    BoxFuture, CacheTransport, ClientError, ClusterClient, Endpoint, HostLimiter,
    InMemoryTransport, KeyRouter, SlotPermit, Xxh64Router,
};
pub use codec::{
    BincodeSerializer, CodecError, JsonSerializer, OpaqueValue, Serializer, StateType,
    TransactionalValue,
};
pub use key::{flatten_key, CompoundKey, KeyShapeError};
pub use metrics::{CounterHandle, MetricsRegistry, StateMetrics};
pub use options::StateOptions;
pub use state::{CacheMapState, ReadOutcome, StateError, WriteOutcome};
