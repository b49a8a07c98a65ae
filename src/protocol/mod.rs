//! RESP2 wire format
//!
//! Clients send commands as arrays of bulk strings and get one reply per
//! command. Independent from the store and the AOF.

mod reply;
mod request;

pub use reply::RespValue;
pub use request::{RequestParser, RespError, MAX_ARGS, MAX_BULK_LEN};
