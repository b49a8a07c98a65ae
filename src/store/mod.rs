//! In-memory storage module
//!
//! Holds the key-value state that the AOF rebuilds on startup.
//! This module is independent of protocol and command handling.

mod entry;
mod memory;
mod value;

pub use entry::{now_ms, Entry};
pub use memory::{MemoryStore, StoreStats};
pub use value::Value;
