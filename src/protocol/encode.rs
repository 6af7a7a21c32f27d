//! Protocol message encoding

use super::constants::{tags, CRLF};
use super::message::Command;
use bytes::{BufMut, BytesMut};

/// Encode a command as a RESP2 array of bulk strings
///
/// ```text
/// *3\r\n$4\r\nHGET\r\n$3\r\nkey\r\n$5\r\nfield\r\n
/// ```
pub fn encode_command(cmd: &Command, buf: &mut BytesMut) {
    let args = cmd.args();
    buf.reserve(16 + cmd.name().len() + args.iter().map(|a| a.len() + 16).sum::<usize>());

    put_header(buf, tags::ARRAY, args.len() + 1);
    put_bulk(buf, cmd.name().as_bytes());
    for arg in args {
        put_bulk(buf, arg);
    }
}

fn put_header(buf: &mut BytesMut, tag: u8, len: usize) {
    buf.put_u8(tag);
    let mut digits = [0u8; 20];
    buf.put_slice(format_decimal(len, &mut digits));
    buf.put_slice(CRLF);
}

fn put_bulk(buf: &mut BytesMut, data: &[u8]) {
    put_header(buf, tags::BULK_STRING, data.len());
    buf.put_slice(data);
    buf.put_slice(CRLF);
}

// Stack formatting keeps the hot path allocation-free
fn format_decimal(mut value: usize, digits: &mut [u8; 20]) -> &[u8] {
    if value == 0 {
        digits[0] = b'0';
        return &digits[..1];
    }
    let mut len = 0;
    while value > 0 {
        digits[len] = b'0' + (value % 10) as u8;
        value /= 10;
        len += 1;
    }
    digits[..len].reverse();
    &digits[..len]
}
