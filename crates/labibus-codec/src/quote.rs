//! Quoted encoding of free-text fields.
//!
//! `!`, `?` and `|` are structural delimiters on the wire, so description, unit
//! and value fields escape them (and `\`, control bytes and anything >= 127) as
//! a backslash followed by two lowercase hex digits, big nibble first.
//!
//! ```text
//! "a|b"  ->  "a\7cb"
//! ```

use crate::buffer::BoundedBuf;
use crate::hex::{parse_hex_digit, value_to_hex_digit};
use crate::{CodecError, CodecResult};

/// Escape marker.
pub const ESCAPE: u8 = b'\\';

/// Whether a byte must be escaped inside a quoted field.
#[inline]
pub fn needs_quoting(byte: u8) -> bool {
    byte < b' ' || byte >= 127 || matches!(byte, b'!' | b'?' | b'|' | b'\\')
}

/// The three-byte escape sequence for `byte`.
fn escaped(byte: u8) -> [u8; 3] {
    [
        ESCAPE,
        value_to_hex_digit(byte >> 4),
        value_to_hex_digit(byte & 0x0f),
    ]
}

/// Append `byte` to `dest`, escaping it if required.
///
/// Like every append into a [`BoundedBuf`], this stops silently at capacity,
/// which can cut an escape sequence short.
pub fn quote_append<const N: usize>(dest: &mut BoundedBuf<N>, byte: u8) {
    if needs_quoting(byte) {
        dest.push_bytes(&escaped(byte));
    } else {
        dest.push(byte);
    }
}

/// Escape a whole byte slice into a growable vector.
pub fn quote(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        if needs_quoting(b) {
            out.extend_from_slice(&escaped(b));
        } else {
            out.push(b);
        }
    }
    out
}

/// Reverse the quoted encoding.
///
/// Unlike the slave side, this is strict: an escape followed by fewer than two
/// hex digits is an error.
pub fn unquote(bytes: &[u8]) -> CodecResult<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == ESCAPE {
            if i + 2 >= bytes.len() {
                return Err(CodecError::TruncatedEscape { offset: i });
            }
            let hi = parse_hex_digit(bytes[i + 1])?;
            let lo = parse_hex_digit(bytes[i + 2])?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(b);
            i += 1;
        }
    }
    Ok(out)
}
