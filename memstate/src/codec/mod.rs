//! Value serialization boundary.
//!
//! Typed values cross into the cache cluster as opaque byte payloads. The
//! [`Serializer`] trait is the seam: the batched client below it only moves
//! `Vec<u8>`, while the state facade above it picks a codec per consistency
//! model.
//!
//! # Consistency models
//!
//! The enclosing framework runs one of three value shapes, and the shape
//! lives in the type system rather than behind a runtime switch:
//!
//! - non-transactional: plain `T`, last write wins
//! - transactional: [`TransactionalValue<T>`], value plus the transaction
//!   id that produced it
//! - opaque: [`OpaqueValue<T>`], current and previous value for
//!   idempotent merge on replay
//!
//! JSON is the default codec for every shape; [`BincodeSerializer`] is the
//! compact explicit override.

mod binary;
mod json;
mod values;

use thiserror::Error;

pub use binary::BincodeSerializer;
pub use json::JsonSerializer;
pub use values::{OpaqueValue, TransactionalValue};

/// Errors raised at the serialization boundary.
///
/// A deserialize failure means the stored payload is corrupt or was written
/// under a different schema. It is never retried and surfaces for the
/// affected key only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The value could not be encoded.
    #[error("serialize failed: {0}")]
    Serialize(String),

    /// The stored payload could not be decoded.
    #[error("deserialize failed: {0}")]
    Deserialize(String),
}

/// Converts typed values to and from cache payloads.
///
/// Implementations must round-trip: `deserialize(serialize(v)) == v` for
/// every valid `v`.
pub trait Serializer<T>: Send + Sync {
    /// Encode a value into its wire payload.
    fn serialize(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Decode a wire payload back into a value.
    fn deserialize(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// The consistency model the enclosing framework runs this state under.
///
/// The model determines the value shape (and thereby the default codec's
/// target type); the batched client below the codec boundary is agnostic
/// to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateType {
    /// Plain values, overwritten in place.
    NonTransactional,
    /// Values tagged with the transaction id that wrote them.
    Transactional,
    /// Current plus previous value, for idempotent merge on replay.
    Opaque,
}

impl StateType {
    /// Short name for logs and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            StateType::NonTransactional => "non_transactional",
            StateType::Transactional => "transactional",
            StateType::Opaque => "opaque",
        }
    }
}

impl std::fmt::Display for StateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
