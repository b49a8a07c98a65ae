//! oxikv - an in-memory key-value store made durable by an append-only file
//!
//! Every write is logged to the AOF before it is applied; on startup the log
//! is replayed to rebuild the store. Modules:
//! - `aof`: frame codec, log handle, append and replay paths, rewrite
//! - `store`: the in-memory keyspace
//! - `commands` / `dispatch`: command execution, shared by clients and replay
//! - `protocol` / `server`: RESP2 over TCP

pub mod aof;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod protocol;
pub mod server;
pub mod store;

/// Re-export commonly used types
pub use aof::{Aof, AofConfig, AofError, Durability, Operation};
pub use commands::{Command, CommandContext};
pub use config::ServerConfig;
pub use dispatch::Dispatcher;
pub use protocol::{RespError, RespValue};
pub use store::{Entry, MemoryStore};
