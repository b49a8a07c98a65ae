//! Hash commands (HSET, HGET, HDEL, HGETALL)

use super::{Command, CommandContext, WRONGTYPE};
use crate::aof::Operation;
use crate::protocol::RespValue;
use crate::store::Value;
use bytes::Bytes;
use std::collections::HashMap;

/// HSET command - Set fields in the hash stored at key
///
/// Syntax: HSET key field value [field value ...]
pub struct HSetCommand;

impl Command for HSetCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        if (args.len() - 1) % 2 != 0 {
            return RespValue::error("ERR wrong number of arguments for 'HSET' command");
        }

        let key = &args[0];
        if matches!(ctx.store.get(key), Some(v) if v.as_hash().is_none()) {
            return RespValue::error(WRONGTYPE);
        }

        if let Err(reply) = ctx.persist(Operation::new("HSET", args.iter().cloned())) {
            return reply;
        }

        if !ctx.store.exists(key) {
            ctx.store.set(key.clone(), Value::empty_hash());
        }
        let Some(hash) = ctx.store.get_mut(key).and_then(Value::as_hash_mut) else {
            return RespValue::error(WRONGTYPE);
        };

        let added = args[1..]
            .chunks_exact(2)
            .filter(|pair| hash.insert(pair[0].clone(), pair[1].clone()).is_none())
            .count();

        RespValue::integer(added as i64)
    }

    fn name(&self) -> &'static str {
        "HSET"
    }

    fn min_args(&self) -> usize {
        3
    }
}

/// HGET command - Get the value of a hash field
///
/// Syntax: HGET key field
pub struct HGetCommand;

impl Command for HGetCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        match ctx.store.get(&args[0]) {
            Some(value) => match value.as_hash() {
                Some(hash) => hash
                    .get(&args[1])
                    .map(|v| RespValue::bulk_string(v.clone()))
                    .unwrap_or_else(RespValue::null),
                None => RespValue::error(WRONGTYPE),
            },
            None => RespValue::null(),
        }
    }

    fn name(&self) -> &'static str {
        "HGET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// HDEL command - Delete fields from a hash
///
/// Syntax: HDEL key field [field ...]
///
/// Deleting the last field removes the key.
pub struct HDelCommand;

impl Command for HDelCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        let key = &args[0];

        let present: Vec<Bytes> = match ctx.store.get(key) {
            None => return RespValue::integer(0),
            Some(value) => match value.as_hash() {
                Some(hash) => {
                    let mut present: Vec<Bytes> = Vec::new();
                    for field in &args[1..] {
                        if hash.contains_key(field) && !present.contains(field) {
                            present.push(field.clone());
                        }
                    }
                    present
                }
                None => return RespValue::error(WRONGTYPE),
            },
        };

        if present.is_empty() {
            return RespValue::integer(0);
        }

        let op = Operation::new("HDEL", std::iter::once(key.clone()).chain(present.iter().cloned()));
        if let Err(reply) = ctx.persist(op) {
            return reply;
        }

        let now_empty = match ctx.store.get_mut(key).and_then(Value::as_hash_mut) {
            Some(hash) => {
                for field in &present {
                    hash.remove(field);
                }
                hash.is_empty()
            }
            None => false,
        };
        if now_empty {
            ctx.store.delete(key);
        }

        RespValue::integer(present.len() as i64)
    }

    fn name(&self) -> &'static str {
        "HDEL"
    }

    fn min_args(&self) -> usize {
        2
    }
}

/// HGETALL command - Get all fields and values in a hash
///
/// Syntax: HGETALL key
pub struct HGetAllCommand;

impl Command for HGetAllCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        let hash: &HashMap<Bytes, Bytes> = match ctx.store.get(&args[0]) {
            Some(value) => match value.as_hash() {
                Some(hash) => hash,
                None => return RespValue::error(WRONGTYPE),
            },
            None => return RespValue::array(vec![]),
        };

        let mut fields: Vec<(&Bytes, &Bytes)> = hash.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        let mut reply = Vec::with_capacity(fields.len() * 2);
        for (field, value) in fields {
            reply.push(RespValue::bulk_string(field.clone()));
            reply.push(RespValue::bulk_string(value.clone()));
        }
        RespValue::array(reply)
    }

    fn name(&self) -> &'static str {
        "HGETALL"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}
