//! Key commands (DEL, EXISTS)

use super::{Command, CommandContext};
use crate::aof::Operation;
use crate::protocol::RespValue;
use bytes::Bytes;

/// DEL command - Delete one or more keys
///
/// Syntax: DEL key [key ...]
///
/// Only keys that currently exist are logged; a DEL that removes nothing
/// leaves the AOF untouched.
pub struct DelCommand;

impl Command for DelCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        let mut existing: Vec<Bytes> = Vec::with_capacity(args.len());
        for key in args {
            if !existing.contains(key) && ctx.store.exists(key) {
                existing.push(key.clone());
            }
        }

        if existing.is_empty() {
            return RespValue::integer(0);
        }

        if let Err(reply) = ctx.persist(Operation::new("DEL", existing.iter().cloned())) {
            return reply;
        }

        let deleted = existing.iter().filter(|key| ctx.store.delete(key)).count();
        RespValue::integer(deleted as i64)
    }

    fn name(&self) -> &'static str {
        "DEL"
    }

    fn min_args(&self) -> usize {
        1
    }
}

/// EXISTS command - Check if one or more keys exist
///
/// Syntax: EXISTS key [key ...]
pub struct ExistsCommand;

impl Command for ExistsCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> RespValue {
        let count = args.iter().filter(|key| ctx.store.exists(key)).count();
        RespValue::integer(count as i64)
    }

    fn name(&self) -> &'static str {
        "EXISTS"
    }

    fn min_args(&self) -> usize {
        1
    }
}
