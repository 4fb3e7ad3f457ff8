//! Bincode codec, the compact alternative to JSON.
//!
//! Payloads are opaque bytes on the wire either way; choose this codec when
//! value volume makes JSON's text overhead matter.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{CodecError, Serializer};

/// Serializes values with bincode.
pub struct BincodeSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeSerializer<T> {
    /// Create a bincode serializer.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for BincodeSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BincodeSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BincodeSerializer")
    }
}

impl<T> Serializer<T> for BincodeSerializer<T>
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(value).map_err(|e| CodecError::Serialize(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T, CodecError> {
        bincode::deserialize(bytes).map_err(|e| CodecError::Deserialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{OpaqueValue, TransactionalValue};

    #[test]
    fn test_round_trip_plain() {
        let codec = BincodeSerializer::<u64>::new();
        let bytes = codec.serialize(&123_456u64).unwrap();
        assert_eq!(codec.deserialize(&bytes).unwrap(), 123_456);
    }

    #[test]
    fn test_round_trip_transactional() {
        let codec = BincodeSerializer::<TransactionalValue<String>>::new();
        let value = TransactionalValue::new(-3, "v".to_string());
        let bytes = codec.serialize(&value).unwrap();
        assert_eq!(codec.deserialize(&bytes).unwrap(), value);
    }

    #[test]
    fn test_round_trip_opaque() {
        let codec = BincodeSerializer::<OpaqueValue<Vec<u8>>>::new();
        let value = OpaqueValue::new(8, vec![1, 2, 3], None);
        let bytes = codec.serialize(&value).unwrap();
        assert_eq!(codec.deserialize(&bytes).unwrap(), value);
    }

    #[test]
    fn test_truncated_bytes_fail_deserialize() {
        let codec = BincodeSerializer::<TransactionalValue<String>>::new();
        let mut bytes = codec
            .serialize(&TransactionalValue::new(1, "payload".to_string()))
            .unwrap();
        bytes.truncate(bytes.len() / 2);
        assert!(matches!(
            codec.deserialize(&bytes),
            Err(CodecError::Deserialize(_))
        ));
    }
}
