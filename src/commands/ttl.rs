//! TTL commands (EXPIRE, PEXPIREAT, TTL)
//!
//! Relative expirations are logged as absolute PEXPIREAT so replaying the AOF
//! later does not extend a key's lifetime.

use super::{parse_integer, Command, CommandContext};
use crate::aof::Operation;
use crate::protocol::RespValue;
use crate::store::now_ms;
use bytes::Bytes;

/// Log and apply an absolute expiration; a time in the past is logged as DEL
fn expire_at(ctx: &mut CommandContext, key: &Bytes, at_ms: u64) -> RespValue {
    if !ctx.store.exists(key) {
        return RespValue::integer(0);
    }

    let op = if at_ms <= now_ms() {
        Operation::new("DEL", [key.clone()])
    } else {
        Operation::new("PEXPIREAT", [key.clone(), Bytes::from(at_ms.to_string())])
    };
    if let Err(reply) = ctx.persist(op) {
        return reply;
    }

    let applied = ctx.store.expire_at(key, at_ms);
    RespValue::integer(applied as i64)
}

/// EXPIRE command - Set a timeout on a key
///
/// Syntax: EXPIRE key seconds
pub struct ExpireCommand;

impl Command for ExpireCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        let seconds = match parse_integer(&args[1]) {
            Ok(s) => s,
            Err(e) => return RespValue::error(format!("ERR {}", e)),
        };

        let at_ms = if seconds <= 0 {
            0
        } else {
            match seconds
                .checked_mul(1000)
                .and_then(|ms| (now_ms() as i64).checked_add(ms))
            {
                Some(at) => at as u64,
                None => return RespValue::error("ERR invalid expire time in 'EXPIRE' command"),
            }
        };

        expire_at(ctx, &args[0], at_ms)
    }

    fn name(&self) -> &'static str {
        "EXPIRE"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// PEXPIREAT command - Set an absolute expiration in unix milliseconds
///
/// Syntax: PEXPIREAT key milliseconds-timestamp
pub struct PExpireAtCommand;

impl Command for PExpireAtCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        let at_ms = match parse_integer(&args[1]) {
            Ok(ms) => ms.max(0) as u64,
            Err(e) => return RespValue::error(format!("ERR {}", e)),
        };

        expire_at(ctx, &args[0], at_ms)
    }

    fn name(&self) -> &'static str {
        "PEXPIREAT"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// TTL command - Get the time to live for a key
///
/// Syntax: TTL key
///
/// Returns:
/// - The TTL in seconds
/// - -1 if the key exists but has no expiration
/// - -2 if the key does not exist
pub struct TtlCommand;

impl Command for TtlCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        RespValue::integer(ctx.store.ttl(&args[0]))
    }

    fn name(&self) -> &'static str {
        "TTL"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}
