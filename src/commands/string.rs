//! String commands (SET, GET)

use super::{parse_integer, Command, CommandContext, WRONGTYPE};
use crate::aof::Operation;
use crate::protocol::RespValue;
use crate::store::{now_ms, Value};
use bytes::Bytes;

/// SET command - Set a key to a value
///
/// Syntax: SET key value [EX seconds | PX milliseconds | PXAT unix-time-milliseconds]
///
/// Always logged as `SET key value [PXAT ms]` so a relative expiration is
/// pinned to an absolute time.
pub struct SetCommand;

impl Command for SetCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        let key = args[0].clone();
        let value = args[1].clone();

        let expire_at_ms = match parse_expiry(&args[2..]) {
            Ok(at) => at,
            Err(reply) => return reply,
        };

        let mut fields = vec![Bytes::from_static(b"SET"), key.clone(), value.clone()];
        if let Some(at) = expire_at_ms {
            fields.push(Bytes::from_static(b"PXAT"));
            fields.push(Bytes::from(at.to_string()));
        }
        if let Err(reply) = ctx.persist(Operation::from_fields(fields)) {
            return reply;
        }

        ctx.store.set(key.clone(), Value::String(value));
        if let Some(at) = expire_at_ms {
            ctx.store.expire_at(&key, at);
        }
        RespValue::simple_string("OK")
    }

    fn name(&self) -> &'static str {
        "SET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(4)
    }
}

/// Parse SET's optional expiration into an absolute unix-milliseconds time
fn parse_expiry(options: &[Bytes]) -> Result<Option<u64>, RespValue> {
    let (unit, amount) = match options {
        [] => return Ok(None),
        [unit, amount] => (unit, amount),
        _ => return Err(RespValue::error("ERR syntax error")),
    };

    let amount = parse_integer(amount).map_err(|e| RespValue::error(format!("ERR {}", e)))?;
    if amount <= 0 {
        return Err(RespValue::error("ERR invalid expire time in 'set' command"));
    }

    let now = now_ms() as i64;
    let at = match unit.to_ascii_uppercase().as_slice() {
        b"EX" => amount.checked_mul(1000).and_then(|ms| now.checked_add(ms)),
        b"PX" => now.checked_add(amount),
        b"PXAT" => Some(amount),
        _ => return Err(RespValue::error("ERR syntax error")),
    };

    at.map(|at| Some(at as u64))
        .ok_or_else(|| RespValue::error("ERR invalid expire time in 'set' command"))
}

/// GET command - Get the value of a key
///
/// Syntax: GET key
pub struct GetCommand;

impl Command for GetCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        match ctx.store.get(&args[0]) {
            Some(Value::Hash(_)) => RespValue::error(WRONGTYPE),
            Some(value) => value.to_bytes().map(RespValue::bulk_string).unwrap_or_else(RespValue::null),
            None => RespValue::null(),
        }
    }

    fn name(&self) -> &'static str {
        "GET"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let mut ctx = CommandContext::new();

        let args = vec![Bytes::from("mykey"), Bytes::from("myvalue")];
        let result = SetCommand.execute(&mut ctx, &args);
        assert_eq!(result, RespValue::simple_string("OK"));

        let args = vec![Bytes::from("mykey")];
        let result = GetCommand.execute(&mut ctx, &args);
        assert_eq!(result, RespValue::bulk_string(Bytes::from("myvalue")));
    }

    #[test]
    fn test_set_with_ex() {
        let mut ctx = CommandContext::new();
        let args = vec![
            Bytes::from("k"),
            Bytes::from("v"),
            Bytes::from("ex"),
            Bytes::from("30"),
        ];
        assert_eq!(SetCommand.execute(&mut ctx, &args), RespValue::simple_string("OK"));
        let ttl = ctx.store.ttl(&Bytes::from("k"));
        assert!((29..=30).contains(&ttl), "ttl was {}", ttl);
    }

    #[test]
    fn test_set_with_bad_option() {
        let mut ctx = CommandContext::new();
        let args = vec![
            Bytes::from("k"),
            Bytes::from("v"),
            Bytes::from("KEEPTTL"),
            Bytes::from("1"),
        ];
        assert_eq!(
            SetCommand.execute(&mut ctx, &args),
            RespValue::error("ERR syntax error")
        );
        assert!(!ctx.store.exists(&Bytes::from("k")));
    }

    #[test]
    fn test_get_nonexistent() {
        let mut ctx = CommandContext::new();
        let result = GetCommand.execute(&mut ctx, &[Bytes::from("nonexistent")]);
        assert_eq!(result, RespValue::null());
    }

    #[test]
    fn test_get_hash_is_wrongtype() {
        let mut ctx = CommandContext::new();
        ctx.store.set("h", Value::empty_hash());
        let result = GetCommand.execute(&mut ctx, &[Bytes::from("h")]);
        assert_eq!(result, RespValue::error(WRONGTYPE));
    }
}
