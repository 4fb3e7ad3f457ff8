//! Wire-protocol seam for the cache cluster.
//!
//! The cluster speaks a standard binary key-value protocol with bulk-get
//! and set; implementing that protocol is out of scope here. Everything the
//! batched client needs from it is captured by [`CacheTransport`], one
//! instance per endpoint. Real deployments plug in their protocol client;
//! tests and local runs use the bundled
//! [`InMemoryTransport`](super::InMemoryTransport).
//!
//! # Dyn Compatibility
//!
//! The trait uses `Pin<Box<dyn Future>>` returns so the client can hold
//! `Arc<dyn CacheTransport>` per endpoint regardless of the concrete
//! protocol implementation.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::error::ClientError;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One endpoint's view of the cache wire protocol.
///
/// Implementations must be `Send + Sync`; one instance serves every
/// concurrent request admitted to its endpoint.
pub trait CacheTransport: Send + Sync {
    /// Establish or verify the connection to the endpoint.
    ///
    /// Called after a connection slot is acquired and bounded by the
    /// configured connect timeout. Must be cheap when already connected.
    fn connect(&self) -> BoxFuture<'_, Result<(), ClientError>>;

    /// Fetch all present entries among `keys`.
    ///
    /// Absent keys are simply missing from the returned map; they are not
    /// an error.
    fn bulk_get(
        &self,
        keys: Vec<String>,
    ) -> BoxFuture<'_, Result<HashMap<String, Vec<u8>>, ClientError>>;

    /// Store one entry, with an optional time-to-live.
    fn set(
        &self,
        key: String,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'_, Result<(), ClientError>>;
}
