//! Request line assembly.
//!
//! Runs in receive-interrupt context, one byte per call. Bytes are ignored until
//! a `?` start marker arrives; from there on everything up to `\n` is collected
//! (a `\r` is skipped, which helps when typing requests by hand in a terminal).
//! A line that outgrows the buffer is dropped without a reply and assembly
//! starts over at the next `?`.

use labibus_codec::{BoundedBuf, MAX_REQ, REQUEST_MARKER};

/// Assembly state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// Waiting for a start marker.
    Idle,
    /// Collecting a request line.
    Accumulating,
}

/// Byte-stream to request-line state machine.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    buf: BoundedBuf<MAX_REQ>,
    state: AssemblerState,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    /// Create an idle assembler.
    pub const fn new() -> Self {
        FrameAssembler {
            buf: BoundedBuf::new(),
            state: AssemblerState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Bytes collected for the current line.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Feed one received byte.
    ///
    /// When the byte completes a line, `on_frame` is called with the line
    /// (start marker included, terminator excluded) before the buffer is reset.
    /// Returns whether a line was delivered.
    pub fn push<F>(&mut self, byte: u8, on_frame: F) -> bool
    where
        F: FnOnce(&[u8]),
    {
        match self.state {
            AssemblerState::Idle => {
                if byte == REQUEST_MARKER {
                    self.buf.clear();
                    self.buf.push(byte);
                    self.state = AssemblerState::Accumulating;
                }
                false
            }
            AssemblerState::Accumulating => match byte {
                b'\r' => false,
                b'\n' => {
                    on_frame(self.buf.as_slice());
                    self.reset();
                    true
                }
                _ => {
                    if !self.buf.push(byte) {
                        log::trace!("request longer than {} bytes dropped", MAX_REQ);
                        self.reset();
                    }
                    false
                }
            },
        }
    }

    /// Drop any partial line and wait for the next start marker.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = AssemblerState::Idle;
    }
}
