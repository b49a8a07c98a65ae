//! AOF frame codec
//!
//! Binary format:
//! [magic(4)] [body_len(u32)] [header_check(u32)] [field_count(u32)] [field_len(u32) field_bytes]* [checksum(u64)]
//!
//! All integers are little-endian. `header_check` is the low half of the
//! xxhash64 of the magic and length, so a frame's size is trusted only once
//! its header verifies; the trailing checksum is xxhash64 of header and body.

use super::{AofError, DecodeError, Operation};
use bytes::{BufMut, Bytes, BytesMut};
use std::io::{self, BufRead, Read};

/// First bytes of every frame
pub const FRAME_MAGIC: [u8; 4] = *b"OXA1";

/// Size of the verified frame header
pub const HEADER_LEN: usize = 12;

/// Size of the trailing checksum
pub const CHECKSUM_LEN: usize = 8;

/// Largest body a frame may carry
pub const MAX_BODY_LEN: usize = 512 * 1024 * 1024;

/// Exact size in bytes of the frame `encode` would produce for `op`
pub fn encoded_len(op: &Operation) -> usize {
    HEADER_LEN + body_len(op) + CHECKSUM_LEN
}

fn body_len(op: &Operation) -> usize {
    4 + op.fields().iter().map(|f| 4 + f.len()).sum::<usize>()
}

/// Reject an operation whose frame `decode` would refuse
pub fn check_frame_size(op: &Operation) -> Result<(), AofError> {
    let len = body_len(op);
    if len > MAX_BODY_LEN {
        return Err(AofError::FrameTooLarge {
            len,
            max: MAX_BODY_LEN,
        });
    }
    Ok(())
}

/// Encode an operation into a new frame
pub fn encode(op: &Operation) -> Bytes {
    let mut buf = BytesMut::with_capacity(encoded_len(op));
    encode_to(&mut buf, op);
    buf.freeze()
}

/// Encode an operation into an existing buffer
///
/// Callers that persist the frame must run `check_frame_size` first.
pub fn encode_to(buf: &mut BytesMut, op: &Operation) {
    let start = buf.len();
    buf.reserve(encoded_len(op));

    buf.put_slice(&FRAME_MAGIC);
    buf.put_u32_le(body_len(op) as u32);
    let check = header_check(&buf[start..]);
    buf.put_u32_le(check);
    buf.put_u32_le(op.fields().len() as u32);
    for field in op.fields() {
        buf.put_u32_le(field.len() as u32);
        buf.put_slice(field);
    }

    let checksum = xxhash_rust::xxh64::xxh64(&buf[start..], 0);
    buf.put_u64_le(checksum);
}

/// Decode one frame from a stream
///
/// Returns `Ok(None)` when the stream ends exactly on a frame boundary,
/// `DecodeError::Incomplete` when it ends inside a frame whose header (as far
/// as it was read) is valid, and `DecodeError::Malformed` for anything that
/// cannot be the start or the whole of a frame.
pub fn decode<R: BufRead>(reader: &mut R) -> Result<Option<Operation>, DecodeError> {
    let mut header = [0u8; HEADER_LEN];
    let got = read_full(reader, &mut header)?;
    if got == 0 {
        return Ok(None);
    }

    let magic_len = got.min(FRAME_MAGIC.len());
    if header[..magic_len] != FRAME_MAGIC[..magic_len] {
        return Err(DecodeError::Malformed(format!(
            "bad frame magic {:02x?}",
            &header[..magic_len]
        )));
    }
    if got < HEADER_LEN {
        return Err(DecodeError::Incomplete {
            needed: HEADER_LEN as u64,
            available: got as u64,
        });
    }

    let stored_check = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
    if stored_check != header_check(&header[..8]) {
        return Err(DecodeError::Malformed("header checksum mismatch".to_string()));
    }

    let body_len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
    if body_len > MAX_BODY_LEN {
        return Err(DecodeError::Malformed(format!(
            "declared body length {} exceeds limit {}",
            body_len, MAX_BODY_LEN
        )));
    }

    let frame_len = HEADER_LEN + body_len + CHECKSUM_LEN;
    let mut frame = vec![0u8; frame_len];
    frame[..HEADER_LEN].copy_from_slice(&header);
    let got = read_full(reader, &mut frame[HEADER_LEN..])?;
    if got < frame_len - HEADER_LEN {
        return Err(DecodeError::Incomplete {
            needed: frame_len as u64,
            available: (HEADER_LEN + got) as u64,
        });
    }

    let (data, trailer) = frame.split_at(HEADER_LEN + body_len);
    let stored = u64::from_le_bytes(
        trailer
            .try_into()
            .map_err(|_| DecodeError::Malformed("invalid checksum".to_string()))?,
    );
    let calculated = xxhash_rust::xxh64::xxh64(data, 0);
    if stored != calculated {
        return Err(DecodeError::Malformed(format!(
            "checksum mismatch: expected {:#018x}, got {:#018x}",
            stored, calculated
        )));
    }

    parse_body(&data[HEADER_LEN..]).map(Some)
}

/// Parse the field list out of a checksummed body
fn parse_body(body: &[u8]) -> Result<Operation, DecodeError> {
    let mut pos = 0;

    let field_count = read_u32(body, &mut pos, "field count")? as usize;
    // Every field needs at least its 4-byte length prefix
    if field_count > (body.len() - pos) / 4 {
        return Err(DecodeError::Malformed(format!(
            "field count {} does not fit in {} byte body",
            field_count,
            body.len()
        )));
    }

    let mut fields = Vec::with_capacity(field_count);
    for index in 0..field_count {
        let len = read_u32(body, &mut pos, "field length")? as usize;
        if len > body.len() - pos {
            return Err(DecodeError::Malformed(format!(
                "field {} length {} overruns body at offset {}",
                index, len, pos
            )));
        }
        fields.push(Bytes::copy_from_slice(&body[pos..pos + len]));
        pos += len;
    }

    if pos != body.len() {
        return Err(DecodeError::Malformed(format!(
            "{} trailing bytes after last field",
            body.len() - pos
        )));
    }

    Ok(Operation::from_fields(fields))
}

/// Low 32 bits of the xxhash64 of the magic and body length
fn header_check(prefix: &[u8]) -> u32 {
    xxhash_rust::xxh64::xxh64(prefix, 0) as u32
}

fn read_u32(body: &[u8], pos: &mut usize, what: &str) -> Result<u32, DecodeError> {
    let end = *pos + 4;
    let bytes: [u8; 4] = body
        .get(*pos..end)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| DecodeError::Malformed(format!("missing {}", what)))?;
    *pos = end;
    Ok(u32::from_le_bytes(bytes))
}

/// Read until `buf` is full or the stream ends; returns the number of bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
