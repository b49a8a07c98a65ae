//! Command execution context

use crate::aof::{Aof, Operation};
use crate::protocol::RespValue;
use crate::store::MemoryStore;
use std::sync::Arc;
use tracing::error;

/// Context provided to commands during execution
///
/// Gives commands access to the store and, when persistence is on, to the AOF.
/// While the AOF is being replayed `aof` is `None`, so replayed commands are
/// not logged a second time.
pub struct CommandContext {
    /// The memory store
    pub store: MemoryStore,

    /// Optional AOF for persistence
    pub aof: Option<Arc<Aof>>,
}

impl CommandContext {
    /// Create a new command context
    pub fn new() -> Self {
        CommandContext {
            store: MemoryStore::new(),
            aof: None,
        }
    }

    /// Create a context with a specific store capacity
    pub fn with_capacity(capacity: usize) -> Self {
        CommandContext {
            store: MemoryStore::with_capacity(capacity),
            aof: None,
        }
    }

    /// Set the AOF
    pub fn set_aof(&mut self, aof: Arc<Aof>) {
        self.aof = Some(aof);
    }

    /// Log an operation before it is applied
    ///
    /// On failure the caller must not apply the operation; the returned value
    /// is the error reply for the client.
    pub fn persist(&self, op: Operation) -> Result<(), RespValue> {
        let Some(aof) = &self.aof else {
            return Ok(());
        };

        aof.append(&op).map_err(|e| {
            error!("Rejecting {}: AOF append failed: {}", op, e);
            RespValue::error("ERR failed to persist write to the append-only file")
        })
    }
}

impl Default for CommandContext {
    fn default() -> Self {
        Self::new()
    }
}
