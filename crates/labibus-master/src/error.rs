//! Error types for the master side.

use labibus_codec::CodecError;
use thiserror::Error;

/// Errors that can occur when reading a reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MasterError {
    /// Reply line did not start with `!`.
    #[error("reply does not start with '!'")]
    MissingMarker,

    /// Reply line is too short to hold a header and CRC.
    #[error("reply too short: {0} bytes")]
    TooShort(usize),

    /// CRC over the body does not match the transmitted one.
    #[error("crc mismatch: computed {computed:04x}, received {received:04x}")]
    CrcMismatch {
        /// CRC computed over the received body.
        computed: u16,
        /// CRC carried in the reply.
        received: u16,
    },

    /// Reply kind marker is neither `D` nor `P`.
    #[error("unknown reply kind: 0x{0:02X}")]
    UnknownKind(u8),

    /// Body does not have the expected fields.
    #[error("malformed reply body: {0}")]
    MalformedBody(String),

    /// A text field is not valid UTF-8 after unescaping.
    #[error("invalid UTF-8 in {0} field")]
    InvalidUtf8(&'static str),

    /// A numeric field did not parse.
    #[error("invalid number: {0}")]
    InvalidNumber(String),

    /// Reply came from a different device or answers a different request.
    #[error("unexpected reply: expected {expected}, got {actual}")]
    Unexpected {
        /// What was asked.
        expected: String,
        /// What arrived.
        actual: String,
    },

    /// Hex or escape decoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result type alias for master operations.
pub type MasterResult<T> = Result<T, MasterError>;
