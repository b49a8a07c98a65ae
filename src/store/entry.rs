//! Entry structure for key-value pairs

use super::value::Value;
use bytes::Bytes;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the UNIX epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Represents a single entry in the store
///
/// Expiration is an absolute wall-clock time so that it means the same thing
/// when the entry is rebuilt from the AOF after a restart.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The key
    pub key: Bytes,

    /// The value
    pub value: Value,

    /// Optional expiration time (unix milliseconds)
    pub expire_at_ms: Option<u64>,
}

impl Entry {
    /// Create a new entry without expiration
    pub fn new(key: impl Into<Bytes>, value: Value) -> Self {
        Entry {
            key: key.into(),
            value,
            expire_at_ms: None,
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_ms())
    }

    /// Check expiry against a given clock reading
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        matches!(self.expire_at_ms, Some(at) if now_ms >= at)
    }

    /// Get remaining TTL in seconds
    pub fn ttl_seconds(&self) -> i64 {
        match self.expire_at_ms {
            Some(at) => {
                let now = now_ms();
                if at > now {
                    // Round up so a key with 900ms left reports 1
                    ((at - now + 999) / 1000) as i64
                } else {
                    -2 // Expired
                }
            }
            None => -1, // No expiration
        }
    }

    /// Calculate approximate memory usage of this entry in bytes
    pub fn memory_usage(&self) -> usize {
        self.key.len() + self.value.memory_usage() + std::mem::size_of::<Option<u64>>()
    }
}
