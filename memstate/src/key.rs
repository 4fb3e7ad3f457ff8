//! Key normalization for the cache wire protocol.
//!
//! The state framework addresses entries with compound keys: ordered lists
//! of opaque string components. The cache cluster only understands flat
//! string keys, so this module translates between the two.
//!
//! This backend supports exactly single-component keys. A compound key with
//! zero or more than one component is a configuration error in the caller's
//! topology, not a transient condition, so `flatten_key` rejects it
//! immediately and nothing downstream retries it.
//!
//! # Key Format
//!
//! The flat key is the sole component's string form, unchanged. Two compound
//! keys whose sole components render to the same string collide by design.

use thiserror::Error;

/// A compound key supplied by the state framework.
///
/// Holds an ordered list of string components. The framework may produce
/// keys of any arity; this backend accepts only single-component keys (see
/// [`flatten_key`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompoundKey {
    parts: Vec<String>,
}

impl CompoundKey {
    /// Create a compound key from an ordered list of components.
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a single-component key, the only shape this backend accepts.
    pub fn single(part: impl Into<String>) -> Self {
        Self {
            parts: vec![part.into()],
        }
    }

    /// The ordered components of this key.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True if the key has no components.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl From<&str> for CompoundKey {
    fn from(part: &str) -> Self {
        Self::single(part)
    }
}

impl From<String> for CompoundKey {
    fn from(part: String) -> Self {
        Self::single(part)
    }
}

/// Error raised for a compound key with other than exactly one component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("compound key has {components} components; this backend supports exactly one")]
pub struct KeyShapeError {
    /// How many components the offending key carried.
    pub components: usize,
}

/// Flatten a compound key into the wire-protocol string key.
///
/// Returns the sole component's string form. There is no decode path: flat
/// keys are never parsed back into compound keys.
///
/// # Errors
///
/// [`KeyShapeError`] when the key has zero or more than one component.
pub fn flatten_key(key: &CompoundKey) -> Result<String, KeyShapeError> {
    match key.parts() {
        [sole] => Ok(sole.clone()),
        parts => Err(KeyShapeError {
            components: parts.len(),
        }),
    }
}
