//! Replies sent back to clients

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt::{self, Write as _};

/// A reply as produced by command handlers
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// +OK\r\n
    SimpleString(String),

    /// -ERR message\r\n
    Error(String),

    /// :1000\r\n
    Integer(i64),

    /// $6\r\nfoobar\r\n
    BulkString(Bytes),

    /// $-1\r\n
    Null,

    /// *2\r\n followed by the elements
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(i: i64) -> Self {
        RespValue::Integer(i)
    }

    pub fn bulk_string(b: impl Into<Bytes>) -> Self {
        RespValue::BulkString(b.into())
    }

    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn array(v: Vec<RespValue>) -> Self {
        RespValue::Array(v)
    }

    /// Append the wire form of this reply to `buf`
    pub fn encode_to(&self, buf: &mut BytesMut) {
        match self {
            RespValue::SimpleString(s) => put_line(buf, b'+', s),
            // A line break inside an error would end the reply early
            RespValue::Error(e) => put_line(buf, b'-', &e.replace(['\r', '\n'], " ")),
            RespValue::Integer(i) => put_header(buf, b':', *i),
            RespValue::BulkString(bytes) => {
                put_header(buf, b'$', bytes.len() as i64);
                buf.put_slice(bytes);
                buf.put_slice(b"\r\n");
            }
            RespValue::Null => buf.put_slice(b"$-1\r\n"),
            RespValue::Array(items) => {
                put_header(buf, b'*', items.len() as i64);
                for item in items {
                    item.encode_to(buf);
                }
            }
        }
    }
}

fn put_line(buf: &mut BytesMut, prefix: u8, line: &str) {
    buf.put_u8(prefix);
    buf.put_slice(line.as_bytes());
    buf.put_slice(b"\r\n");
}

fn put_header(buf: &mut BytesMut, prefix: u8, n: i64) {
    buf.put_u8(prefix);
    // Writing into a BytesMut cannot fail
    let _ = write!(buf, "{}\r\n", n);
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "+{}", s),
            RespValue::Error(e) => write!(f, "-{}", e),
            RespValue::Integer(i) => write!(f, ":{}", i),
            RespValue::BulkString(b) => write!(f, "${} bytes", b.len()),
            RespValue::Null => write!(f, "(nil)"),
            RespValue::Array(items) => write!(f, "*{} items", items.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(value: RespValue) -> BytesMut {
        let mut buf = BytesMut::new();
        value.encode_to(&mut buf);
        buf
    }

    #[test]
    fn test_encode_scalars() {
        assert_eq!(&encoded(RespValue::simple_string("OK"))[..], b"+OK\r\n");
        assert_eq!(&encoded(RespValue::integer(-42))[..], b":-42\r\n");
        assert_eq!(&encoded(RespValue::null())[..], b"$-1\r\n");
        assert_eq!(&encoded(RespValue::bulk_string("foobar"))[..], b"$6\r\nfoobar\r\n");
        assert_eq!(&encoded(RespValue::bulk_string(""))[..], b"$0\r\n\r\n");
    }

    #[test]
    fn test_encode_error_stays_on_one_line() {
        assert_eq!(
            &encoded(RespValue::error("ERR bad\r\nthing"))[..],
            b"-ERR bad  thing\r\n"
        );
    }

    #[test]
    fn test_encode_nested_array() {
        let reply = RespValue::array(vec![
            RespValue::bulk_string("f"),
            RespValue::null(),
            RespValue::array(vec![RespValue::integer(1)]),
        ]);
        assert_eq!(&encoded(reply)[..], b"*3\r\n$1\r\nf\r\n$-1\r\n*1\r\n:1\r\n");
    }

    #[test]
    fn test_encode_appends() {
        let mut buf = BytesMut::from("+A\r\n");
        RespValue::simple_string("B").encode_to(&mut buf);
        assert_eq!(&buf[..], b"+A\r\n+B\r\n");
    }
}
