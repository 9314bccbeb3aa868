//! Error types for the codec.
//!
//! The slave side never surfaces these; it treats every malformed input as a
//! silent drop. They exist for the master side, which has to tell a user why a
//! reply could not be read.

use thiserror::Error;

/// Errors from strict decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A byte that should have been a hex digit was not.
    #[error("invalid hex digit: 0x{0:02X}")]
    InvalidHexDigit(u8),

    /// An escape sequence was cut short by the end of the input.
    #[error("truncated escape sequence at offset {offset}")]
    TruncatedEscape {
        /// Offset of the backslash.
        offset: usize,
    },

    /// Input had the wrong number of bytes.
    #[error("wrong length: expected {expected} bytes, got {actual}")]
    WrongLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
}

/// Result type alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
