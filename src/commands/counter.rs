//! Counter commands (INCR, INCRBY, DECR, DECRBY)
//!
//! Counters are logged as a SET of the resulting value (carrying the key's
//! expiration, if any), so replay never redoes the arithmetic.

use super::{parse_integer, Command, CommandContext, WRONGTYPE};
use crate::aof::Operation;
use crate::protocol::RespValue;
use crate::store::Value;
use bytes::Bytes;

/// Add `delta` to the integer at `key`, logging the new value first
fn increment(ctx: &mut CommandContext, key: &Bytes, delta: i64) -> RespValue {
    let current = match ctx.store.get(key) {
        None => 0,
        Some(Value::Hash(_)) => return RespValue::error(WRONGTYPE),
        Some(value) => match value.as_integer() {
            Some(i) => i,
            None => return RespValue::error("ERR value is not an integer or out of range"),
        },
    };

    let new_value = match current.checked_add(delta) {
        Some(v) => v,
        None => return RespValue::error("ERR increment or decrement would overflow"),
    };

    // Keep any expiration the key already had
    let expire_at_ms = ctx.store.get_entry(key).and_then(|e| e.expire_at_ms);

    let mut fields = vec![
        Bytes::from_static(b"SET"),
        key.clone(),
        Bytes::from(new_value.to_string()),
    ];
    if let Some(at) = expire_at_ms {
        fields.push(Bytes::from_static(b"PXAT"));
        fields.push(Bytes::from(at.to_string()));
    }
    if let Err(reply) = ctx.persist(Operation::from_fields(fields)) {
        return reply;
    }

    ctx.store.set(key.clone(), Value::Integer(new_value));
    if let Some(at) = expire_at_ms {
        ctx.store.expire_at(key, at);
    }

    RespValue::integer(new_value)
}

fn delta_arg(arg: &Bytes) -> Result<i64, RespValue> {
    parse_integer(arg).map_err(|e| RespValue::error(format!("ERR {}", e)))
}

/// INCR command - Increment the integer value of a key by 1
///
/// Syntax: INCR key
pub struct IncrCommand;

impl Command for IncrCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        increment(ctx, &args[0], 1)
    }

    fn name(&self) -> &'static str {
        "INCR"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// INCRBY command - Increment the integer value of a key by the given amount
///
/// Syntax: INCRBY key increment
pub struct IncrByCommand;

impl Command for IncrByCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        match delta_arg(&args[1]) {
            Ok(delta) => increment(ctx, &args[0], delta),
            Err(reply) => reply,
        }
    }

    fn name(&self) -> &'static str {
        "INCRBY"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// DECR command - Decrement the integer value of a key by 1
///
/// Syntax: DECR key
pub struct DecrCommand;

impl Command for DecrCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        increment(ctx, &args[0], -1)
    }

    fn name(&self) -> &'static str {
        "DECR"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// DECRBY command - Decrement the integer value of a key by the given amount
///
/// Syntax: DECRBY key decrement
pub struct DecrByCommand;

impl Command for DecrByCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        let delta = match delta_arg(&args[1]) {
            Ok(delta) => delta,
            Err(reply) => return reply,
        };
        match delta.checked_neg() {
            Some(delta) => increment(ctx, &args[0], delta),
            None => RespValue::error("ERR decrement would overflow"),
        }
    }

    fn name(&self) -> &'static str {
        "DECRBY"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}
