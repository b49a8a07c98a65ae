//! Command dispatcher
//!
//! Routes incoming commands to the appropriate handler.
//! Client requests and replayed AOF operations take the same path, so a
//! replayed log rebuilds exactly the state the original commands produced.

use crate::aof::{Aof, AofConfig, AofError, Operation, ReplayReport};
use crate::commands::{CommandContext, CommandRegistry};
use crate::protocol::RespValue;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Command dispatcher
///
/// Receives RESP commands, validates them, and routes to appropriate handlers
pub struct Dispatcher {
    /// Command registry
    registry: CommandRegistry,

    /// Command execution context
    context: CommandContext,

    /// Set by `shutdown`; later commands are refused
    closed: bool,
}

impl Dispatcher {
    /// Create a new dispatcher without persistence
    pub fn new() -> Self {
        Dispatcher {
            registry: CommandRegistry::new(),
            context: CommandContext::new(),
            closed: false,
        }
    }

    /// Create a dispatcher with specified store capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Dispatcher {
            registry: CommandRegistry::new(),
            context: CommandContext::with_capacity(capacity),
            closed: false,
        }
    }

    /// Create a dispatcher backed by the AOF described in `config`
    ///
    /// The log is replayed into an empty store before it accepts any append.
    /// A corrupt log is an error: the caller must not serve from partial state.
    pub fn open(config: &AofConfig) -> Result<Self, AofError> {
        let mut dispatcher = Dispatcher::new();
        if !config.enabled {
            info!("AOF disabled, starting with an empty store");
            return Ok(dispatcher);
        }

        let mut aof = Aof::open(&config.path, config.durability())?;
        let report = dispatcher.replay(&mut aof)?;
        if report.truncated_bytes > 0 {
            warn!(
                "Discarded {} bytes of an incomplete trailing write",
                report.truncated_bytes
            );
        }

        dispatcher.context.set_aof(Arc::new(aof));
        Ok(dispatcher)
    }

    /// Apply every operation of `aof` to this dispatcher's store
    fn replay(&mut self, aof: &mut Aof) -> Result<ReplayReport, AofError> {
        let mut rejected = 0usize;
        let report = aof.replay(|op| {
            if let RespValue::Error(e) = self.execute_operation(&op) {
                rejected += 1;
                warn!("Replayed {} was rejected: {}", op, e);
            }
        })?;

        info!(
            "Loaded {} keys from {} AOF operations ({} rejected)",
            self.context.store.len(),
            report.applied,
            rejected
        );
        Ok(report)
    }

    /// Dispatch a client command
    ///
    /// `args` is the request as parsed off the wire: the command name
    /// followed by its arguments.
    pub fn dispatch(&mut self, args: &[Bytes]) -> RespValue {
        self.execute(args)
    }

    /// Execute an operation read back from the AOF
    pub fn execute_operation(&mut self, op: &Operation) -> RespValue {
        self.execute(op.fields())
    }

    fn execute(&mut self, fields: &[Bytes]) -> RespValue {
        if self.closed {
            return RespValue::error("ERR server is shutting down");
        }

        let Some((name, args)) = fields.split_first() else {
            return RespValue::error("ERR empty command");
        };

        let cmd_name = match std::str::from_utf8(name) {
            Ok(s) => s,
            Err(_) => {
                let b64 = general_purpose::STANDARD.encode(name);
                debug!("Invalid command name encoding. Raw bytes (B64): {}", b64);
                return RespValue::error("ERR invalid command name encoding");
            }
        };

        let command = match self.registry.get(cmd_name) {
            Some(cmd) => cmd,
            None => {
                warn!("Unknown command: {}", cmd_name);
                return RespValue::error(format!("ERR unknown command '{}'", cmd_name));
            }
        };

        let too_many = command.max_args().is_some_and(|max| args.len() > max);
        if args.len() < command.min_args() || too_many {
            return RespValue::error(format!(
                "ERR wrong number of arguments for '{}' command",
                cmd_name
            ));
        }

        debug!("Dispatching {} ({} args)", command.name(), args.len());
        command.execute(&mut self.context, args)
    }

    /// Get reference to the context (for testing/inspection)
    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    /// Get mutable reference to the context (for testing/inspection)
    pub fn context_mut(&mut self) -> &mut CommandContext {
        &mut self.context
    }

    /// Detach the AOF and make everything appended so far durable
    ///
    /// Commands dispatched afterwards are refused, so nothing is acknowledged
    /// without being logged.
    pub fn shutdown(&mut self) -> Result<(), AofError> {
        self.closed = true;
        let Some(aof) = self.context.aof.take() else {
            return Ok(());
        };

        match Arc::try_unwrap(aof) {
            Ok(aof) => aof.close(),
            Err(shared) => {
                error!("AOF still referenced at shutdown, syncing instead of closing");
                shared.sync()
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
