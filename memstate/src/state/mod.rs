//! The map-state surface consumed by the stream framework.
//!
//! [`CacheMapState`] is the thin typed facade over the batched client: it
//! flattens compound keys, applies the value codec for the configured
//! consistency model, and counts reads/writes. It keeps no per-call state;
//! the framework calls `multi_get`/`multi_put` from its own worker tasks.
//!
//! # Failure granularity
//!
//! Results are per-key. A key that exhausted its retries or hit a corrupt
//! payload comes back as [`ReadOutcome::Failed`] / [`WriteOutcome::Failed`]
//! in its own slot, distinct from [`ReadOutcome::Miss`], and the rest of
//! the batch stands. The only whole-call errors are caller mistakes: a
//! compound key with the wrong shape, or mismatched key/value lengths.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use memstate::{
//!     CacheMapState, ClusterClient, CompoundKey, Endpoint, MetricsRegistry,
//!     StateMetrics, StateOptions, TransactionalValue,
//! };
//!
//! let registry = MetricsRegistry::new();
//! let metrics = Arc::new(StateMetrics::register(&registry));
//! let client = Arc::new(ClusterClient::in_memory(
//!     vec![Endpoint::new("cache-1", 11211)],
//!     StateOptions::default(),
//!     metrics,
//! ));
//!
//! let state: CacheMapState<TransactionalValue<u64>> =
//!     CacheMapState::transactional(client);
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::client::{ClientError, ClusterClient};
use crate::codec::{
    JsonSerializer, OpaqueValue, Serializer, StateType, TransactionalValue,
};
use crate::key::{flatten_key, CompoundKey, KeyShapeError};
use crate::metrics::StateMetrics;

/// Caller errors that fail a whole facade call.
///
/// Everything else stays inside the per-key outcome slots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// A compound key had other than exactly one component.
    #[error(transparent)]
    KeyShape(#[from] KeyShapeError),

    /// `multi_put` was given differing numbers of keys and values.
    #[error("multi_put needs one value per key: {keys} keys, {values} values")]
    LengthMismatch {
        /// Number of keys supplied.
        keys: usize,
        /// Number of values supplied.
        values: usize,
    },
}

/// Per-key result of a read.
#[derive(Debug, Clone)]
pub enum ReadOutcome<T> {
    /// The key was present; its value decoded.
    Hit(T),
    /// The key has no entry in the cache. Not an error.
    Miss,
    /// This key's sub-batch failed, or its payload would not decode.
    Failed(ClientError),
}

impl<T> ReadOutcome<T> {
    /// The value for a hit, `None` for a miss or failure.
    pub fn value(self) -> Option<T> {
        match self {
            ReadOutcome::Hit(value) => Some(value),
            _ => None,
        }
    }

    /// True for [`ReadOutcome::Hit`].
    pub fn is_hit(&self) -> bool {
        matches!(self, ReadOutcome::Hit(_))
    }

    /// True for [`ReadOutcome::Miss`].
    pub fn is_miss(&self) -> bool {
        matches!(self, ReadOutcome::Miss)
    }

    /// The error for a failed slot.
    pub fn error(&self) -> Option<&ClientError> {
        match self {
            ReadOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Per-key result of a write.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    /// The value was stored.
    Written,
    /// The write exhausted its retries or the value would not encode.
    Failed(ClientError),
}

impl WriteOutcome {
    /// True for [`WriteOutcome::Written`].
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written)
    }

    /// The error for a failed write.
    pub fn error(&self) -> Option<&ClientError> {
        match self {
            WriteOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Typed map-state backed by the batched cache client.
///
/// `T` is the stored value shape; the constructors pin it to the
/// consistency model the framework runs under.
pub struct CacheMapState<T> {
    client: Arc<ClusterClient>,
    serializer: Arc<dyn Serializer<T>>,
    state_type: StateType,
    metrics: Arc<StateMetrics>,
}

impl<T> CacheMapState<T> {
    /// Build a state over `client` with an explicit codec.
    pub fn with_serializer(
        client: Arc<ClusterClient>,
        serializer: Arc<dyn Serializer<T>>,
        state_type: StateType,
    ) -> Self {
        tracing::debug!(state_type = %state_type, "creating cache map state");
        let metrics = Arc::clone(client.metrics());
        Self {
            client,
            serializer,
            state_type,
            metrics,
        }
    }

    /// The consistency model this state was built for.
    pub fn state_type(&self) -> StateType {
        self.state_type
    }

    /// Read values for `keys`, one outcome per key in input order.
    ///
    /// # Errors
    ///
    /// [`StateError::KeyShape`] when any key has other than one component;
    /// nothing is fetched in that case.
    pub async fn multi_get(&self, keys: &[CompoundKey]) -> Result<Vec<ReadOutcome<T>>, StateError> {
        let mut flat = Vec::with_capacity(keys.len());
        for key in keys {
            flat.push(flatten_key(key)?);
        }

        let fetched = self.client.multi_get(flat).await;

        let mut outcomes = Vec::with_capacity(fetched.len());
        for slot in fetched {
            outcomes.push(match slot {
                Ok(Some(bytes)) => match self.serializer.deserialize(&bytes) {
                    Ok(value) => ReadOutcome::Hit(value),
                    Err(err) => {
                        self.metrics.exception();
                        ReadOutcome::Failed(ClientError::Codec(err))
                    }
                },
                Ok(None) => ReadOutcome::Miss,
                Err(err) => ReadOutcome::Failed(err),
            });
        }

        self.metrics.read_batch(outcomes.len() as u64);
        Ok(outcomes)
    }

    /// Write `values` under `keys`, one outcome per pair in input order.
    ///
    /// Every write carries the configured expiration. A value that fails
    /// to encode occupies its slot as [`WriteOutcome::Failed`] and is
    /// never sent; the remaining writes proceed.
    ///
    /// # Errors
    ///
    /// [`StateError::LengthMismatch`] or [`StateError::KeyShape`]; nothing
    /// is written in either case.
    pub async fn multi_put(
        &self,
        keys: &[CompoundKey],
        values: &[T],
    ) -> Result<Vec<WriteOutcome>, StateError> {
        if keys.len() != values.len() {
            return Err(StateError::LengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }

        // Flatten every key first: a bad key aborts before any write
        let mut flat = Vec::with_capacity(keys.len());
        for key in keys {
            flat.push(flatten_key(key)?);
        }

        // Encode, keeping a slot for values that refuse to serialize
        let mut prepared: Vec<Result<(String, Vec<u8>), ClientError>> =
            Vec::with_capacity(keys.len());
        for (flat_key, value) in flat.into_iter().zip(values) {
            match self.serializer.serialize(value) {
                Ok(bytes) => prepared.push(Ok((flat_key, bytes))),
                Err(err) => {
                    self.metrics.exception();
                    prepared.push(Err(ClientError::Codec(err)));
                }
            }
        }

        let entries: Vec<(String, Vec<u8>)> = prepared
            .iter()
            .filter_map(|slot| slot.as_ref().ok().cloned())
            .collect();
        let mut written = self
            .client
            .multi_put(entries, self.client.options().expiration)
            .await
            .into_iter();

        let mut outcomes = Vec::with_capacity(prepared.len());
        let mut stored = 0u64;
        for slot in prepared {
            outcomes.push(match slot {
                Ok(_) => match written.next().expect("one write result per entry") {
                    Ok(()) => {
                        stored += 1;
                        WriteOutcome::Written
                    }
                    Err(err) => WriteOutcome::Failed(err),
                },
                Err(err) => WriteOutcome::Failed(err),
            });
        }

        self.metrics.wrote_batch(stored);
        Ok(outcomes)
    }
}

impl<T> CacheMapState<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// State for the non-transactional model: plain values, JSON codec.
    pub fn non_transactional(client: Arc<ClusterClient>) -> Self {
        Self::with_serializer(
            client,
            Arc::new(JsonSerializer::new()),
            StateType::NonTransactional,
        )
    }
}

impl<V> CacheMapState<TransactionalValue<V>>
where
    V: Serialize + DeserializeOwned + 'static,
{
    /// State for the transactional model: txid-tagged values, JSON codec.
    pub fn transactional(client: Arc<ClusterClient>) -> Self {
        Self::with_serializer(
            client,
            Arc::new(JsonSerializer::new()),
            StateType::Transactional,
        )
    }
}

impl<V> CacheMapState<OpaqueValue<V>>
where
    V: Serialize + DeserializeOwned + 'static,
{
    /// State for the opaque model: curr/prev values, JSON codec.
    pub fn opaque(client: Arc<ClusterClient>) -> Self {
        Self::with_serializer(client, Arc::new(JsonSerializer::new()), StateType::Opaque)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::client::{CacheTransport, Endpoint, InMemoryTransport};
    use crate::codec::BincodeSerializer;
    use crate::options::StateOptions;

    fn in_memory_state(options: StateOptions) -> (CacheMapState<String>, Arc<StateMetrics>) {
        let metrics = Arc::new(StateMetrics::unregistered());
        let client = Arc::new(ClusterClient::in_memory(
            vec![Endpoint::new("cache-1", 11211)],
            options,
            Arc::clone(&metrics),
        ));
        (CacheMapState::non_transactional(client), metrics)
    }

    fn single_keys(names: &[&str]) -> Vec<CompoundKey> {
        names.iter().map(|n| CompoundKey::single(*n)).collect()
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let (state, _) = in_memory_state(StateOptions::default());

        let keys = single_keys(&["x"]);
        state
            .multi_put(&keys, &["9".to_string()])
            .await
            .unwrap();

        let results = state.multi_get(&keys).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].clone().value(), Some("9".to_string()));
    }

    #[tokio::test]
    async fn test_absent_key_is_miss_not_error() {
        let (state, _) = in_memory_state(StateOptions::default());

        let results = state.multi_get(&single_keys(&["nothing"])).await.unwrap();
        assert!(results[0].is_miss());
    }

    #[tokio::test]
    async fn test_sub_batching_example() {
        // The worked example: batch cap 2, cluster holding {a: "1", c: "3"}
        let (state, _) =
            in_memory_state(StateOptions::default().with_max_multi_get_batch_size(2));

        state
            .multi_put(
                &single_keys(&["a", "c"]),
                &["1".to_string(), "3".to_string()],
            )
            .await
            .unwrap();

        let results = state.multi_get(&single_keys(&["a", "b", "c"])).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].clone().value(), Some("1".to_string()));
        assert!(results[1].is_miss());
        assert_eq!(results[2].clone().value(), Some("3".to_string()));
    }

    #[tokio::test]
    async fn test_multi_get_empty_batch() {
        let (state, _) = in_memory_state(StateOptions::default());
        let results = state.multi_get(&[]).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_key_shape_error_aborts_call() {
        let (state, metrics) = in_memory_state(StateOptions::default());

        let keys = vec![
            CompoundKey::single("fine"),
            CompoundKey::new(["two", "parts"]),
        ];
        let err = state.multi_get(&keys).await.unwrap_err();
        assert_eq!(
            err,
            StateError::KeyShape(KeyShapeError { components: 2 })
        );
        // Aborted before any fetch: no reads recorded
        assert_eq!(metrics.reads(), 0);
    }

    #[tokio::test]
    async fn test_length_mismatch_rejected() {
        let (state, _) = in_memory_state(StateOptions::default());

        let err = state
            .multi_put(&single_keys(&["a", "b"]), &["1".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err, StateError::LengthMismatch { keys: 2, values: 1 });
    }

    #[tokio::test]
    async fn test_corrupt_payload_fails_that_key_only() {
        let metrics = Arc::new(StateMetrics::unregistered());
        let transport = Arc::new(InMemoryTransport::new());
        // Seed one valid JSON string and one corrupt payload
        transport
            .set("ok".to_string(), b"\"fine\"".to_vec(), None)
            .await
            .unwrap();
        transport
            .set("corrupt".to_string(), vec![0xff, 0x00], None)
            .await
            .unwrap();

        let client = Arc::new(ClusterClient::new(
            vec![(
                Endpoint::new("cache-1", 11211),
                transport as Arc<dyn CacheTransport>,
            )],
            StateOptions::default(),
            Arc::clone(&metrics),
        ));
        let state: CacheMapState<String> = CacheMapState::non_transactional(client);

        let results = state
            .multi_get(&single_keys(&["ok", "corrupt"]))
            .await
            .unwrap();

        assert_eq!(results[0].clone().value(), Some("fine".to_string()));
        assert!(matches!(
            results[1].error(),
            Some(ClientError::Codec(_))
        ));
        assert_eq!(metrics.exceptions(), 1);
        // Both slots still count as reads
        assert_eq!(metrics.reads(), 2);
    }

    #[tokio::test]
    async fn test_read_metric_counts_all_slots() {
        let (state, metrics) = in_memory_state(StateOptions::default());

        state
            .multi_put(&single_keys(&["a"]), &["1".to_string()])
            .await
            .unwrap();
        state
            .multi_get(&single_keys(&["a", "missing", "gone"]))
            .await
            .unwrap();

        // Hits and misses both count
        assert_eq!(metrics.reads(), 3);
    }

    #[tokio::test]
    async fn test_write_metric_counts_successful_writes() {
        let (state, metrics) = in_memory_state(StateOptions::default());

        state
            .multi_put(
                &single_keys(&["a", "b"]),
                &["1".to_string(), "2".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(metrics.writes(), 2);
        assert_eq!(metrics.exceptions(), 0);
    }

    #[tokio::test]
    async fn test_expiration_applied_to_writes() {
        let (state, _) = in_memory_state(
            StateOptions::default().with_expiration(Duration::from_millis(50)),
        );

        let keys = single_keys(&["fleeting"]);
        state
            .multi_put(&keys, &["v".to_string()])
            .await
            .unwrap();

        let results = state.multi_get(&keys).await.unwrap();
        assert!(results[0].is_hit());

        tokio::time::sleep(Duration::from_millis(120)).await;
        let results = state.multi_get(&keys).await.unwrap();
        assert!(results[0].is_miss());
    }

    #[tokio::test]
    async fn test_transactional_state_round_trip() {
        let metrics = Arc::new(StateMetrics::unregistered());
        let client = Arc::new(ClusterClient::in_memory(
            vec![Endpoint::new("cache-1", 11211)],
            StateOptions::default(),
            metrics,
        ));
        let state: CacheMapState<TransactionalValue<u64>> =
            CacheMapState::transactional(client);
        assert_eq!(state.state_type(), StateType::Transactional);

        let keys = single_keys(&["counter"]);
        let value = TransactionalValue::new(12, 400u64);
        state.multi_put(&keys, &[value.clone()]).await.unwrap();

        let results = state.multi_get(&keys).await.unwrap();
        assert_eq!(results[0].clone().value(), Some(value));
    }

    #[tokio::test]
    async fn test_opaque_state_round_trip() {
        let metrics = Arc::new(StateMetrics::unregistered());
        let client = Arc::new(ClusterClient::in_memory(
            vec![Endpoint::new("cache-1", 11211)],
            StateOptions::default(),
            metrics,
        ));
        let state: CacheMapState<OpaqueValue<String>> = CacheMapState::opaque(client);

        let keys = single_keys(&["k"]);
        let value = OpaqueValue::new(3, "now".to_string(), Some("before".to_string()));
        state.multi_put(&keys, &[value.clone()]).await.unwrap();

        let results = state.multi_get(&keys).await.unwrap();
        assert_eq!(results[0].clone().value(), Some(value));
    }

    #[tokio::test]
    async fn test_explicit_bincode_override() {
        let metrics = Arc::new(StateMetrics::unregistered());
        let client = Arc::new(ClusterClient::in_memory(
            vec![Endpoint::new("cache-1", 11211)],
            StateOptions::default(),
            metrics,
        ));
        let state: CacheMapState<u64> = CacheMapState::with_serializer(
            client,
            Arc::new(BincodeSerializer::new()),
            StateType::NonTransactional,
        );

        let keys = single_keys(&["n"]);
        state.multi_put(&keys, &[99u64]).await.unwrap();

        let results = state.multi_get(&keys).await.unwrap();
        assert_eq!(results[0].clone().value(), Some(99));
    }
}
