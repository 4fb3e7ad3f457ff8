//! Key-to-endpoint placement.
//!
//! Which server owns a key is a property of the cluster client, not of the
//! surrounding state machinery, so it sits behind a trait. The default
//! router hashes the flat key with xxh64 and takes it modulo the node
//! count; deployments with their own placement scheme (weighted rings,
//! virtual nodes) implement [`KeyRouter`] themselves.

use xxhash_rust::xxh64::xxh64;

/// Picks the owning node for a flat key.
pub trait KeyRouter: Send + Sync {
    /// Return the owning node index for `key`.
    ///
    /// Must return a value in `0..nodes`. `nodes` is always at least 1.
    fn route(&self, key: &str, nodes: usize) -> usize;
}

/// Default placement: stable xxh64 hash modulo node count.
///
/// The hash is seed-stable across processes and restarts, so every client
/// instance agrees on placement for the same endpoint list.
#[derive(Debug, Default, Clone, Copy)]
pub struct Xxh64Router;

impl KeyRouter for Xxh64Router {
    fn route(&self, key: &str, nodes: usize) -> usize {
        debug_assert!(nodes > 0);
        (xxh64(key.as_bytes(), 0) % nodes as u64) as usize
    }
}
