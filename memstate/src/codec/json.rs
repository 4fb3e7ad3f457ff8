//! JSON codec, the default for every consistency model.
//!
//! JSON keeps stored payloads inspectable from any memcached client
//! (`get <key>` prints something readable), which is worth the size
//! overhead for state that operators debug in place. Swap in
//! [`BincodeSerializer`](super::BincodeSerializer) where payload size
//! dominates.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{CodecError, Serializer};

/// Serializes values as JSON via serde.
///
/// Stateless; one instance serves any number of concurrent calls.
pub struct JsonSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonSerializer<T> {
    /// Create a JSON serializer.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonSerializer")
    }
}

impl<T> Serializer<T> for JsonSerializer<T>
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Serialize(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Deserialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{OpaqueValue, TransactionalValue};
    use proptest::prelude::*;

    #[test]
    fn test_round_trip_plain() {
        let codec = JsonSerializer::<String>::new();
        let bytes = codec.serialize(&"hello".to_string()).unwrap();
        assert_eq!(codec.deserialize(&bytes).unwrap(), "hello");
    }

    #[test]
    fn test_round_trip_transactional() {
        let codec = JsonSerializer::<TransactionalValue<u64>>::new();
        let value = TransactionalValue::new(42, 1_000u64);
        let bytes = codec.serialize(&value).unwrap();
        assert_eq!(codec.deserialize(&bytes).unwrap(), value);
    }

    #[test]
    fn test_round_trip_opaque() {
        let codec = JsonSerializer::<OpaqueValue<String>>::new();
        let value = OpaqueValue::new(9, "curr".to_string(), Some("prev".to_string()));
        let bytes = codec.serialize(&value).unwrap();
        assert_eq!(codec.deserialize(&bytes).unwrap(), value);
    }

    #[test]
    fn test_payload_is_readable_json() {
        let codec = JsonSerializer::<TransactionalValue<i32>>::new();
        let bytes = codec.serialize(&TransactionalValue::new(1, 5)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"txid\":1"));
    }

    #[test]
    fn test_garbage_bytes_fail_deserialize() {
        let codec = JsonSerializer::<TransactionalValue<i32>>::new();
        let err = codec.deserialize(&[0xff, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, CodecError::Deserialize(_)));
    }

    #[test]
    fn test_wrong_shape_fails_deserialize() {
        let plain = JsonSerializer::<u64>::new();
        let bytes = plain.serialize(&7u64).unwrap();

        let opaque = JsonSerializer::<OpaqueValue<u64>>::new();
        assert!(matches!(
            opaque.deserialize(&bytes),
            Err(CodecError::Deserialize(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_round_trip_plain_strings(s in ".*") {
            let codec = JsonSerializer::<String>::new();
            let bytes = codec.serialize(&s).unwrap();
            prop_assert_eq!(codec.deserialize(&bytes).unwrap(), s);
        }

        #[test]
        fn prop_round_trip_opaque(txid in any::<i64>(), curr in any::<i64>(), prev in any::<Option<i64>>()) {
            let codec = JsonSerializer::<OpaqueValue<i64>>::new();
            let value = OpaqueValue::new(txid, curr, prev);
            let bytes = codec.serialize(&value).unwrap();
            prop_assert_eq!(codec.deserialize(&bytes).unwrap(), value);
        }
    }
}
