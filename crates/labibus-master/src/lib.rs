//! Labibus master helpers
//!
//! The master end of the Labibus RS485 sensor bus: encode discovery and poll
//! requests, accumulate the bytes coming back, and decode and verify replies.
//! The simulator's client commands and the end-to-end tests drive slaves with
//! these.
//!
//! # Example
//!
//! ```rust
//! use labibus_codec::RequestKind;
//! use labibus_master::{encode_request, ReplyCodec};
//!
//! let request = encode_request(9, RequestKind::Poll);
//! // ... write `request` to the bus, read bytes back ...
//! let mut codec = ReplyCodec::new();
//! codec.push(b"\xff!09:P23.500000|");
//! assert!(codec.decode().unwrap().is_none()); // line not complete yet
//! # let _ = request;
//! ```

mod codec;
mod error;
mod reply;
mod request;

pub use codec::*;
pub use error::*;
pub use reply::*;
pub use request::*;
