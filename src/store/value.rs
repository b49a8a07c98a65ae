//! Value types for the key-value store

use bytes::Bytes;
use std::collections::HashMap;

/// Represents the different types of values that can be stored
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String value (binary-safe)
    String(Bytes),

    /// Integer value (used for counters)
    Integer(i64),

    /// Hash map (field -> value)
    Hash(HashMap<Bytes, Bytes>),
}

impl Value {
    /// Create a string value
    pub fn string(bytes: impl Into<Bytes>) -> Self {
        Value::String(bytes.into())
    }

    /// Create an integer value
    pub fn integer(i: i64) -> Self {
        Value::Integer(i)
    }

    /// Create an empty hash
    pub fn empty_hash() -> Self {
        Value::Hash(HashMap::new())
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Hash(_) => "hash",
        }
    }

    /// Try to get as string bytes
    pub fn as_string(&self) -> Option<&Bytes> {
        match self {
            Value::String(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get as integer, parsing strings that hold one
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::String(b) => std::str::from_utf8(b).ok()?.parse().ok(),
            Value::Hash(_) => None,
        }
    }

    /// Try to get as hash reference
    pub fn as_hash(&self) -> Option<&HashMap<Bytes, Bytes>> {
        match self {
            Value::Hash(hash) => Some(hash),
            _ => None,
        }
    }

    /// Try to get as mutable hash
    pub fn as_hash_mut(&mut self) -> Option<&mut HashMap<Bytes, Bytes>> {
        match self {
            Value::Hash(hash) => Some(hash),
            _ => None,
        }
    }

    /// String form used when the value is logged or returned to clients
    pub fn to_bytes(&self) -> Option<Bytes> {
        match self {
            Value::String(b) => Some(b.clone()),
            Value::Integer(i) => Some(Bytes::from(i.to_string())),
            Value::Hash(_) => None,
        }
    }

    /// Calculate approximate memory usage of this value in bytes
    pub fn memory_usage(&self) -> usize {
        match self {
            Value::String(b) => b.len(),
            Value::Integer(_) => std::mem::size_of::<i64>(),
            Value::Hash(hash) => hash.iter().map(|(k, v)| k.len() + v.len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_parsing_from_string() {
        assert_eq!(Value::string("42").as_integer(), Some(42));
        assert_eq!(Value::string("abc").as_integer(), None);
        assert_eq!(Value::empty_hash().as_integer(), None);
    }

    #[test]
    fn test_to_bytes() {
        assert_eq!(Value::integer(-7).to_bytes(), Some(Bytes::from("-7")));
        assert_eq!(Value::empty_hash().to_bytes(), None);
    }
}
