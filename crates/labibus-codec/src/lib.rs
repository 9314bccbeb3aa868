//! Labibus wire codec
//!
//! Leaf encoding primitives shared by the slave engine and the master-side
//! helpers of the Labibus RS485 sensor bus.
//!
//! # Protocol Overview
//!
//! Labibus is an ASCII, line-based request/response protocol on a half-duplex
//! multi-drop bus. A master addresses one device at a time:
//!
//! ```text
//! ?09:D|cccc\r\n                                   discovery request
//! ?09:P|cccc\r\n                                   poll request
//! <FF>!09:D10|Temperature room 2|degree C|cccc\r\n  discovery reply
//! <FF>!09:P23.500000|cccc\r\n                        poll reply
//! ```
//!
//! `cccc` is the CRC-16/ARC of everything from the first marker through the
//! last `|`, as four lowercase hex digits. Free-text fields use the quoted
//! encoding from [`quote`].
//!
//! # Example
//!
//! ```rust
//! use labibus_codec::{crc16_of, encode_hex_u16, BoundedBuf};
//!
//! let mut line = BoundedBuf::<16>::new();
//! line.push_str("?09:D|");
//! let crc = crc16_of(line.as_slice());
//! line.push_bytes(&encode_hex_u16(crc));
//! assert_eq!(line.len(), 10);
//! ```

mod buffer;
mod crc;
mod error;
mod hex;
mod message;
pub mod quote;

pub use buffer::*;
pub use crc::*;
pub use error::*;
pub use hex::*;
pub use message::*;
pub use quote::{needs_quoting, quote, quote_append, unquote};

/// Start marker of a request line (master to slave).
pub const REQUEST_MARKER: u8 = b'?';

/// Start marker of a reply body (slave to master).
pub const REPLY_MARKER: u8 = b'!';

/// Field separator.
pub const FIELD_SEPARATOR: u8 = b'|';

/// Sync byte sent ahead of every reply so the master UART can find a byte boundary.
pub const SYNC_BYTE: u8 = 0xff;

/// Maximum description length a device is expected to use.
pub const MAX_DESCRIPTION: usize = 140;

/// Maximum unit length a device is expected to use.
pub const MAX_UNIT: usize = 20;

/// Size of the request receive buffer. Reply buffers hold one byte less.
pub const MAX_REQ: usize = 20 + MAX_DESCRIPTION + MAX_UNIT;
