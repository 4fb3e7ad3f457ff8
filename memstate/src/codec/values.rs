//! Value shapes for the transactional and opaque consistency models.
//!
//! These mirror the wrappers the enclosing framework persists. The merge
//! logic that consumes them (replaying a batch against `prev`, comparing
//! transaction ids) lives in the framework; this crate only moves them
//! through the codec boundary intact.

use serde::{Deserialize, Serialize};

/// A value tagged with the transaction id that wrote it.
///
/// The framework skips a write when the stored `txid` already matches the
/// current batch, which makes replays exact no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionalValue<T> {
    /// Id of the batch that produced this value.
    pub txid: i64,
    /// The wrapped value.
    pub value: T,
}

impl<T> TransactionalValue<T> {
    /// Create a transactional value.
    pub fn new(txid: i64, value: T) -> Self {
        Self { txid, value }
    }
}

/// Current and previous value for the opaque consistency model.
///
/// On replay of batch `curr_txid` the framework rolls back to `prev` before
/// re-applying, so partially-applied batches merge idempotently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueValue<T> {
    /// Id of the batch that produced `curr`.
    pub curr_txid: i64,
    /// The current value.
    pub curr: T,
    /// The value before `curr_txid` was applied, if any.
    pub prev: Option<T>,
}

impl<T> OpaqueValue<T> {
    /// Create an opaque value.
    pub fn new(curr_txid: i64, curr: T, prev: Option<T>) -> Self {
        Self {
            curr_txid,
            curr,
            prev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transactional_value_new() {
        let value = TransactionalValue::new(7, "count".to_string());
        assert_eq!(value.txid, 7);
        assert_eq!(value.value, "count");
    }

    #[test]
    fn test_opaque_value_new() {
        let value = OpaqueValue::new(3, 10u64, Some(4u64));
        assert_eq!(value.curr_txid, 3);
        assert_eq!(value.curr, 10);
        assert_eq!(value.prev, Some(4));
    }

    #[test]
    fn test_opaque_value_without_previous() {
        let value: OpaqueValue<i32> = OpaqueValue::new(1, 5, None);
        assert!(value.prev.is_none());
    }
}
