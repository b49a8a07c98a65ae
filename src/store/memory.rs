//! In-memory storage implementation

use super::entry::{now_ms, Entry};
use super::value::Value;
use crate::aof::Operation;
use bytes::Bytes;
use siphasher::sip::SipHasher13;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;

/// Type alias for our hash map with SipHasher
type StoreMap = HashMap<Bytes, Entry, BuildHasherDefault<SipHasher13>>;

/// In-memory key-value store
///
/// Single-threaded; the dispatcher serializes access to it. Expired keys are
/// removed lazily on access and proactively by `cleanup_expired`.
pub struct MemoryStore {
    store: StoreMap,
}

impl MemoryStore {
    /// Create a new memory store with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new memory store with specified initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        MemoryStore {
            store: HashMap::with_capacity_and_hasher(
                capacity,
                BuildHasherDefault::<SipHasher13>::default(),
            ),
        }
    }

    /// Set a key-value pair, clearing any expiration; returns true if the key is new
    pub fn set(&mut self, key: impl Into<Bytes>, value: Value) -> bool {
        let key = key.into();
        let is_new = !self.exists(&key);
        self.store.insert(key.clone(), Entry::new(key, value));
        is_new
    }

    /// Drop the key if it has expired; returns true if it is still live
    fn evict_if_expired(&mut self, key: &Bytes) -> bool {
        match self.store.get(key) {
            Some(entry) if entry.is_expired() => {
                self.store.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Get a value by key, returns None if not found or expired
    pub fn get(&mut self, key: &Bytes) -> Option<&Value> {
        if !self.evict_if_expired(key) {
            return None;
        }
        self.store.get(key).map(|entry| &entry.value)
    }

    /// Get a mutable reference to a value by key
    pub fn get_mut(&mut self, key: &Bytes) -> Option<&mut Value> {
        if !self.evict_if_expired(key) {
            return None;
        }
        self.store.get_mut(key).map(|entry| &mut entry.value)
    }

    /// Delete a key, returns true if the key existed
    pub fn delete(&mut self, key: &Bytes) -> bool {
        match self.store.remove(key) {
            Some(entry) => !entry.is_expired(),
            None => false,
        }
    }

    /// Check if a key exists (and is not expired)
    pub fn exists(&mut self, key: &Bytes) -> bool {
        self.evict_if_expired(key)
    }

    /// Set an absolute expiration (unix milliseconds) on a key
    ///
    /// A time in the past deletes the key. Returns true if the key existed.
    pub fn expire_at(&mut self, key: &Bytes, at_ms: u64) -> bool {
        if !self.evict_if_expired(key) {
            return false;
        }
        if at_ms <= now_ms() {
            self.store.remove(key);
            return true;
        }
        if let Some(entry) = self.store.get_mut(key) {
            entry.expire_at_ms = Some(at_ms);
        }
        true
    }

    /// Get TTL for a key in seconds
    /// Returns:
    /// - n >= 0: remaining TTL in seconds
    /// - -1: key exists but has no expiration
    /// - -2: key does not exist or is expired
    pub fn ttl(&mut self, key: &Bytes) -> i64 {
        if !self.evict_if_expired(key) {
            return -2;
        }
        self.store.get(key).map(|e| e.ttl_seconds()).unwrap_or(-2)
    }

    /// Get the entry for a key (including expiration metadata)
    pub fn get_entry(&self, key: &Bytes) -> Option<&Entry> {
        self.store.get(key).filter(|entry| !entry.is_expired())
    }

    /// Remove all keys
    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Get the number of live keys
    pub fn len(&self) -> usize {
        let now = now_ms();
        self.store.values().filter(|e| !e.is_expired_at(now)).count()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get all live keys (expensive operation, for debugging/admin)
    pub fn keys(&self) -> Vec<Bytes> {
        let now = now_ms();
        self.store
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect()
    }

    /// Cleanup expired keys (proactive expiration)
    /// Returns the number of keys removed
    pub fn cleanup_expired(&mut self) -> usize {
        let now = now_ms();
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired_at(now));
        before - self.store.len()
    }

    /// Operations that rebuild the current state from an empty store
    ///
    /// Used to rewrite the AOF: one SET (with PXAT when the key expires) or
    /// HSET per key; hashes with an expiration get a trailing PEXPIREAT.
    pub fn snapshot_operations(&self) -> Vec<Operation> {
        let now = now_ms();
        let mut ops = Vec::with_capacity(self.store.len());

        for entry in self.store.values().filter(|e| !e.is_expired_at(now)) {
            let expiry = entry.expire_at_ms.map(|at| Bytes::from(at.to_string()));

            match &entry.value {
                Value::Hash(hash) if hash.is_empty() => {}
                Value::Hash(hash) => {
                    let mut fields = Vec::with_capacity(2 + hash.len() * 2);
                    fields.push(Bytes::from_static(b"HSET"));
                    fields.push(entry.key.clone());
                    for (field, value) in hash {
                        fields.push(field.clone());
                        fields.push(value.clone());
                    }
                    ops.push(Operation::from_fields(fields));

                    if let Some(at) = expiry {
                        ops.push(Operation::new("PEXPIREAT", [entry.key.clone(), at]));
                    }
                }
                scalar => {
                    let Some(bytes) = scalar.to_bytes() else {
                        continue;
                    };
                    let mut fields = vec![Bytes::from_static(b"SET"), entry.key.clone(), bytes];
                    if let Some(at) = expiry {
                        fields.push(Bytes::from_static(b"PXAT"));
                        fields.push(at);
                    }
                    ops.push(Operation::from_fields(fields));
                }
            }
        }

        ops
    }

    /// Calculate approximate memory usage of stored data in bytes
    pub fn memory_usage(&self) -> usize {
        let now = now_ms();
        self.store
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.memory_usage())
            .sum()
    }

    /// Get statistics about the store
    pub fn stats(&self) -> StoreStats {
        let now = now_ms();
        let active_keys = self.store.values().filter(|e| !e.is_expired_at(now)).count();
        let expires = self
            .store
            .values()
            .filter(|e| e.expire_at_ms.is_some() && !e.is_expired_at(now))
            .count();

        StoreStats {
            total_keys: self.store.len(),
            expired_keys: self.store.len() - active_keys,
            active_keys,
            keys_with_expiry: expires,
            used_memory_bytes: self.memory_usage(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the memory store
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub total_keys: usize,
    pub expired_keys: usize,
    pub active_keys: usize,
    pub keys_with_expiry: usize,
    pub used_memory_bytes: usize,
}
