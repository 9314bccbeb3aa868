//! Reply line accumulation.
//!
//! Bytes arrive from the bus in arbitrary chunks. Each reply is preceded by a
//! `0xFF` sync byte and may be surrounded by line noise from the transceiver
//! turning around, so everything before a `!` marker is discarded.

use bytes::{Buf, BytesMut};
use labibus_codec::REPLY_MARKER;

use crate::error::MasterResult;
use crate::reply::Reply;

/// Upper bound on a buffered partial line before it is thrown away.
pub const MAX_LINE_LENGTH: usize = 512;

/// Accumulates received bytes into reply lines.
#[derive(Debug, Default)]
pub struct ReplyCodec {
    buffer: BytesMut,
}

impl ReplyCodec {
    /// Create an empty codec.
    pub fn new() -> Self {
        ReplyCodec {
            buffer: BytesMut::with_capacity(MAX_LINE_LENGTH),
        }
    }

    /// Add received data.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Take the next complete reply line, without the line end.
    pub fn decode_line(&mut self) -> Option<Vec<u8>> {
        // Drop sync bytes and noise ahead of the marker.
        match self.buffer.iter().position(|&b| b == REPLY_MARKER) {
            Some(start) => self.buffer.advance(start),
            None => {
                self.buffer.clear();
                return None;
            }
        }

        let Some(end) = self.buffer.iter().position(|&b| b == b'\n') else {
            if self.buffer.len() > MAX_LINE_LENGTH {
                log::debug!("discarding {} bytes without line end", self.buffer.len());
                self.buffer.clear();
            }
            return None;
        };

        let mut line = self.buffer.split_to(end + 1).to_vec();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    /// Take and decode the next complete reply.
    ///
    /// Returns `Ok(None)` if no complete line is buffered yet.
    pub fn decode(&mut self) -> MasterResult<Option<Reply>> {
        match self.decode_line() {
            Some(line) => Reply::decode(&line).map(Some),
            None => Ok(None),
        }
    }

    /// Number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
