//! Command execution module
//!
//! Provides a unified interface for all commands through the Command trait.
//! Mutating commands persist their effect to the AOF *before* touching the
//! store, so the log is always the source of truth after a crash.

mod context;
mod registry;

// Command implementations
mod admin;
mod counter;
mod hash;
mod key;
mod string;
mod ttl;

pub use context::CommandContext;
pub use registry::CommandRegistry;

use crate::protocol::RespValue;
use bytes::Bytes;

/// Command execution trait
pub trait Command: Send + Sync {
    /// Execute the command with the given context and arguments
    ///
    /// Arguments:
    /// - ctx: mutable reference to the command context (store + AOF)
    /// - args: command arguments (excluding the command name itself)
    ///
    /// Returns:
    /// - RespValue representing the response to send to the client
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue;

    /// Get the command name (for debugging/logging)
    fn name(&self) -> &'static str;

    /// Get the minimum number of arguments required
    fn min_args(&self) -> usize {
        0
    }

    /// Get the maximum number of arguments (None = unlimited)
    fn max_args(&self) -> Option<usize> {
        None
    }
}

pub(crate) const WRONGTYPE: &str =
    "WRONGTYPE Operation against a key holding the wrong kind of value";

/// Parse a signed integer argument
pub(crate) fn parse_integer(value: &Bytes) -> Result<i64, &'static str> {
    std::str::from_utf8(value)
        .map_err(|_| "value is not an integer or out of range")?
        .parse::<i64>()
        .map_err(|_| "value is not an integer or out of range")
}
