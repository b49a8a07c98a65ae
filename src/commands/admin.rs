//! Admin commands (PING, INFO, FLUSHDB, REWRITEAOF)

use super::{Command, CommandContext};
use crate::aof::Operation;
use crate::protocol::RespValue;
use bytes::Bytes;
use tracing::{error, info};

/// PING command - Check that the server is alive
///
/// Syntax: PING [message]
pub struct PingCommand;

impl Command for PingCommand {
    fn execute(&self, _ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        match args.first() {
            Some(message) => RespValue::bulk_string(message.clone()),
            None => RespValue::simple_string("PONG"),
        }
    }

    fn name(&self) -> &'static str {
        "PING"
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// INFO command - Get information and statistics about the server
///
/// Syntax: INFO [section]
pub struct InfoCommand;

impl Command for InfoCommand {
    fn execute(&self, ctx: &mut CommandContext, _args: &[Bytes]) -> RespValue {
        let stats = ctx.store.stats();

        let mut info = format!(
            "# Server\r\n\
            oxikv_version:{}\r\n\
            os:{}\r\n\
            arch:{}\r\n\
            \r\n\
            # Memory\r\n\
            used_memory:{}\r\n\
            \r\n\
            # Persistence\r\n",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH,
            stats.used_memory_bytes,
        );

        match &ctx.aof {
            Some(aof) => {
                let aof_stats = aof.stats();
                info.push_str(&format!(
                    "aof_enabled:1\r\n\
                    aof_current_size:{}\r\n\
                    aof_frames_appended:{}\r\n\
                    aof_syncs:{}\r\n\
                    aof_last_write_status:{}\r\n",
                    aof_stats.size_bytes,
                    aof_stats.frames_appended,
                    aof_stats.syncs,
                    if aof_stats.last_write_ok { "ok" } else { "err" },
                ));
            }
            None => info.push_str("aof_enabled:0\r\n"),
        }

        info.push_str(&format!(
            "\r\n# Keyspace\r\ndb0:keys={},expires={}\r\n",
            stats.active_keys, stats.keys_with_expiry
        ));

        RespValue::bulk_string(info)
    }

    fn name(&self) -> &'static str {
        "INFO"
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// FLUSHDB command - Remove all keys from the current database
///
/// Syntax: FLUSHDB
pub struct FlushDbCommand;

impl Command for FlushDbCommand {
    fn execute(&self, ctx: &mut CommandContext, _args: &[Bytes]) -> RespValue {
        if let Err(reply) = ctx.persist(Operation::new("FLUSHDB", Vec::<Bytes>::new())) {
            return reply;
        }
        ctx.store.clear();
        RespValue::simple_string("OK")
    }

    fn name(&self) -> &'static str {
        "FLUSHDB"
    }

    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
}

/// REWRITEAOF command - Compact the append-only file
///
/// Syntax: REWRITEAOF
///
/// Runs synchronously: the log is replaced by the minimal set of operations
/// that rebuilds the current keyspace.
pub struct RewriteAofCommand;

impl Command for RewriteAofCommand {
    fn execute(&self, ctx: &mut CommandContext, _args: &[Bytes]) -> RespValue {
        let Some(aof) = ctx.aof.clone() else {
            return RespValue::error("ERR append-only file is disabled");
        };

        ctx.store.cleanup_expired();
        let ops = ctx.store.snapshot_operations();
        let count = ops.len();

        match aof.rewrite(ops) {
            Ok(size) => {
                info!("REWRITEAOF: {} operations, {} bytes", count, size);
                RespValue::simple_string("OK")
            }
            Err(e) => {
                error!("REWRITEAOF failed: {}", e);
                RespValue::error(format!("ERR rewrite failed: {}", e))
            }
        }
    }

    fn name(&self) -> &'static str {
        "REWRITEAOF"
    }

    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
}
