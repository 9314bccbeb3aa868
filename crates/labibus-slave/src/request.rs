//! Request validation.
//!
//! The only accepted request is exactly ten bytes:
//!
//! ```text
//! ? I I : X | C C C C
//! 0 1 2 3 4 5 6 7 8 9
//! ```
//!
//! `II` is the device id in hex, `X` is `D` (discover) or `P` (poll), and
//! `CCCC` is the CRC-16 of bytes 0..6 in hex. Anything else, including a
//! well-formed request with a bad CRC, is dropped without a reply: on a shared
//! bus a reply to a garbled request could collide with the device that was
//! actually addressed.

use labibus_codec::{
    crc16_of, decode_hex_u16, decode_hex_u8, RequestKind, FIELD_SEPARATOR, REQUEST_MARKER,
};

/// Length of a request line without its terminator.
pub const REQUEST_LEN: usize = 10;

/// Number of leading bytes covered by the request CRC.
const CRC_COVERED: usize = 6;

/// A validated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// Addressed device.
    pub device_id: u8,
    /// What is asked.
    pub kind: RequestKind,
}

/// Validate an assembled request line.
pub fn parse_request(frame: &[u8]) -> Option<Request> {
    if frame.len() != REQUEST_LEN {
        log::trace!("request dropped: length {}", frame.len());
        return None;
    }
    if frame[0] != REQUEST_MARKER || frame[5] != FIELD_SEPARATOR {
        log::trace!("request dropped: bad markers");
        return None;
    }
    let Some(kind) = RequestKind::from_marker(frame[4]) else {
        log::trace!("request dropped: unknown kind 0x{:02x}", frame[4]);
        return None;
    };

    let computed = crc16_of(&frame[..CRC_COVERED]);
    let received = decode_hex_u16([frame[6], frame[7], frame[8], frame[9]]);
    if computed != received {
        log::trace!(
            "request dropped: crc mismatch (computed {:04x}, received {:04x})",
            computed,
            received
        );
        return None;
    }

    Some(Request {
        device_id: decode_hex_u8([frame[1], frame[2]]),
        kind,
    })
}
