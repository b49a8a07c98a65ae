//! Request parsing
//!
//! A request is `*<n>\r\n` followed by `n` bulk strings `$<len>\r\n<bytes>\r\n`.
//! Inline commands and other RESP types are rejected. The buffer is scanned
//! with a cursor and only consumed once the whole request is present; the
//! arguments are then zero-copy slices of the consumed bytes.

use bytes::{Bytes, BytesMut};
use std::ops::Range;
use thiserror::Error;

/// Largest bulk string a client may send
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Most arguments accepted in one request
pub const MAX_ARGS: usize = 1024 * 1024;

/// A length line longer than this without a newline is garbage
const MAX_LENGTH_LINE: usize = 32;

const CRLF: &[u8] = b"\r\n";

/// Malformed request; the connection cannot resynchronise after one
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RespError {
    #[error("expected {expected:?}, got {found:?}")]
    UnexpectedByte { expected: char, found: char },

    #[error("invalid length")]
    InvalidLength,

    #[error("missing CRLF")]
    MissingCrlf,

    #[error("bulk string of {0} bytes exceeds limit")]
    BulkTooLong(usize),

    #[error("{0} arguments exceed limit")]
    TooManyArguments(usize),
}

/// Parser for client requests
pub struct RequestParser;

impl RequestParser {
    /// Take one complete request off the front of `buf`
    ///
    /// Returns Ok(None) and leaves `buf` untouched while the request is still
    /// partial.
    pub fn parse(buf: &mut BytesMut) -> Result<Option<Vec<Bytes>>, RespError> {
        let mut cursor = 0;

        let Some(count) = Self::length_line(buf, &mut cursor, b'*')? else {
            return Ok(None);
        };
        if count > MAX_ARGS {
            return Err(RespError::TooManyArguments(count));
        }

        let mut spans: Vec<Range<usize>> = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let Some(len) = Self::length_line(buf, &mut cursor, b'$')? else {
                return Ok(None);
            };
            if len > MAX_BULK_LEN {
                return Err(RespError::BulkTooLong(len));
            }

            let end = cursor + len;
            if buf.len() < end + CRLF.len() {
                return Ok(None);
            }
            if &buf[end..end + CRLF.len()] != CRLF {
                return Err(RespError::MissingCrlf);
            }
            spans.push(cursor..end);
            cursor = end + CRLF.len();
        }

        let request = buf.split_to(cursor).freeze();
        Ok(Some(spans.into_iter().map(|span| request.slice(span)).collect()))
    }

    /// Read `<prefix><decimal>\r\n` at `cursor`, advancing past it
    fn length_line(buf: &[u8], cursor: &mut usize, prefix: u8) -> Result<Option<usize>, RespError> {
        let rest = &buf[*cursor..];
        let Some(&first) = rest.first() else {
            return Ok(None);
        };
        if first != prefix {
            return Err(RespError::UnexpectedByte {
                expected: prefix as char,
                found: first as char,
            });
        }

        let Some(newline) = rest.iter().position(|&b| b == b'\n') else {
            if rest.len() > MAX_LENGTH_LINE {
                return Err(RespError::InvalidLength);
            }
            return Ok(None);
        };
        if rest[newline - 1] != b'\r' {
            return Err(RespError::MissingCrlf);
        }

        let len = parse_decimal(&rest[1..newline - 1]).ok_or(RespError::InvalidLength)?;
        *cursor += newline + 1;
        Ok(Some(len))
    }
}

/// Unsigned decimal without sign or padding rules; None on anything else
fn parse_decimal(digits: &[u8]) -> Option<usize> {
    if digits.is_empty() || digits.len() > MAX_LENGTH_LINE {
        return None;
    }
    digits.iter().try_fold(0usize, |acc, &d| {
        if !d.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add(usize::from(d - b'0'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> Result<Option<Vec<Bytes>>, RespError> {
        RequestParser::parse(&mut BytesMut::from(input))
    }

    #[test]
    fn test_parse_command() {
        let mut buf = BytesMut::from(&b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n"[..]);
        let args = RequestParser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(args, vec![Bytes::from("SET"), Bytes::from("key"), Bytes::from("value")]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_parse_leaves_next_request_in_buffer() {
        let mut buf = BytesMut::from(&b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPI"[..]);
        assert_eq!(
            RequestParser::parse(&mut buf).unwrap(),
            Some(vec![Bytes::from("PING")])
        );
        assert_eq!(&buf[..], b"*1\r\n$4\r\nPI");
        assert_eq!(RequestParser::parse(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_partial_request_consumes_nothing() {
        let full = b"*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n";
        for cut in 0..full.len() {
            let mut buf = BytesMut::from(&full[..cut]);
            assert_eq!(RequestParser::parse(&mut buf).unwrap(), None, "cut at {}", cut);
            assert_eq!(buf.len(), cut);
        }
    }

    #[test]
    fn test_binary_and_empty_arguments() {
        let args = parse(b"*3\r\n$3\r\nSET\r\n$0\r\n\r\n$4\r\n\x00\r\n\xff\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(args[1], Bytes::new());
        assert_eq!(args[2], Bytes::from_static(b"\x00\r\n\xff"));
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(parse(b"*0\r\n").unwrap(), Some(vec![]));
    }

    #[test]
    fn test_rejects_other_types() {
        assert_eq!(
            parse(b"PING\r\n"),
            Err(RespError::UnexpectedByte { expected: '*', found: 'P' })
        );
        assert_eq!(
            parse(b"*1\r\n:12\r\n"),
            Err(RespError::UnexpectedByte { expected: '$', found: ':' })
        );
        assert_eq!(
            parse(b"*1\r\n+OK\r\n"),
            Err(RespError::UnexpectedByte { expected: '$', found: '+' })
        );
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert_eq!(parse(b"*-1\r\n"), Err(RespError::InvalidLength));
        assert_eq!(parse(b"*\r\n"), Err(RespError::InvalidLength));
        assert_eq!(parse(b"*1\r\n$x\r\n"), Err(RespError::InvalidLength));
        assert_eq!(parse(b"*99999999999999999999999\r\n"), Err(RespError::InvalidLength));
        assert_eq!(parse(b"*1\n"), Err(RespError::MissingCrlf));
        assert_eq!(parse(&[b'*'; 64]), Err(RespError::InvalidLength));
    }

    #[test]
    fn test_rejects_missing_terminator() {
        assert_eq!(parse(b"*1\r\n$3\r\nGETXX"), Err(RespError::MissingCrlf));
    }

    #[test]
    fn test_limits() {
        let too_long = format!("*1\r\n${}\r\n", MAX_BULK_LEN + 1);
        assert_eq!(
            parse(too_long.as_bytes()),
            Err(RespError::BulkTooLong(MAX_BULK_LEN + 1))
        );

        let too_many = format!("*{}\r\n", MAX_ARGS + 1);
        assert_eq!(
            parse(too_many.as_bytes()),
            Err(RespError::TooManyArguments(MAX_ARGS + 1))
        );
    }
}
