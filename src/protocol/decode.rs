//! Protocol message decoding

use super::constants::{tags, MAX_ARRAY_LENGTH, MAX_BULK_LENGTH, MAX_NESTING_DEPTH};
use super::message::Value;
use crate::{Error, Result};
use bytes::{Buf, Bytes, BytesMut};

/// Decode one reply from the front of `buf`.
///
/// Returns `Ok(Some(value))` and advances `buf` past the frame when a complete
/// reply is buffered, `Ok(None)` (leaving `buf` untouched) when more bytes are
/// needed, or a protocol error for malformed input.
///
/// Length headers are checked against [`MAX_BULK_LENGTH`] and
/// [`MAX_ARRAY_LENGTH`] before anything is allocated.
pub fn decode_value(buf: &mut BytesMut) -> Result<Option<Value>> {
    match parse(&buf[..], 0, 0)? {
        Some((value, consumed)) => {
            buf.advance(consumed);
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Parse a value starting at `pos`; returns the value and the position just
/// past it.
fn parse(data: &[u8], pos: usize, depth: usize) -> Result<Option<(Value, usize)>> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Error::Protocol(format!(
            "reply nesting exceeds {} levels",
            MAX_NESTING_DEPTH
        )));
    }
    let Some(&tag) = data.get(pos) else {
        return Ok(None);
    };
    let Some((line, next)) = read_line(data, pos + 1) else {
        return Ok(None);
    };

    match tag {
        tags::SIMPLE_STRING => Ok(Some((Value::Status(utf8(line)?), next))),
        tags::ERROR => Ok(Some((Value::Error(utf8(line)?), next))),
        tags::INTEGER => Ok(Some((Value::Integer(parse_decimal(line)?), next))),
        tags::BULK_STRING => {
            let len = parse_decimal(line)?;
            if len == -1 {
                return Ok(Some((Value::Nil, next)));
            }
            let len = checked_length(len, MAX_BULK_LENGTH, "bulk string")?;
            let end = next + len;
            if data.len() < end + 2 {
                return Ok(None);
            }
            if &data[end..end + 2] != b"\r\n" {
                return Err(Error::Protocol("bulk string not terminated by CRLF".into()));
            }
            let payload = Bytes::copy_from_slice(&data[next..end]);
            Ok(Some((Value::Bulk(payload), end + 2)))
        }
        tags::ARRAY => {
            let count = parse_decimal(line)?;
            if count == -1 {
                return Ok(Some((Value::Nil, next)));
            }
            let count = checked_length(count, MAX_ARRAY_LENGTH, "array")?;
            // Cap the up-front reservation; the remaining bytes bound the real size
            let mut items = Vec::with_capacity(count.min(data.len() - next));
            let mut cursor = next;
            for _ in 0..count {
                match parse(data, cursor, depth + 1)? {
                    Some((item, after)) => {
                        items.push(item);
                        cursor = after;
                    }
                    None => return Ok(None),
                }
            }
            Ok(Some((Value::Array(items), cursor)))
        }
        other => Err(Error::Protocol(format!(
            "unknown reply type byte: 0x{:02X}",
            other
        ))),
    }
}

/// Find the CRLF-terminated line starting at `start`
fn read_line(data: &[u8], start: usize) -> Option<(&[u8], usize)> {
    let rest = data.get(start..)?;
    let end = rest.windows(2).position(|w| w == b"\r\n")?;
    Some((&rest[..end], start + end + 2))
}

fn parse_decimal(line: &[u8]) -> Result<i64> {
    let text = std::str::from_utf8(line)
        .map_err(|_| Error::Protocol("invalid UTF-8 in length or integer".into()))?;
    text.parse::<i64>()
        .map_err(|_| Error::Protocol(format!("invalid integer: {:?}", text)))
}

fn checked_length(len: i64, max: usize, what: &str) -> Result<usize> {
    if len < 0 {
        return Err(Error::Protocol(format!("negative {} length {}", what, len)));
    }
    let len = len as usize;
    if len > max {
        return Err(Error::Protocol(format!(
            "{} length {} exceeds maximum allowed {}",
            what, len, max
        )));
    }
    Ok(len)
}

fn utf8(line: &[u8]) -> Result<String> {
    String::from_utf8(line.to_vec())
        .map_err(|e| Error::Protocol(format!("invalid UTF-8 in status line: {}", e)))
}
