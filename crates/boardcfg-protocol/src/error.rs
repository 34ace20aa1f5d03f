//! Protocol error types.

use thiserror::Error;

/// Errors raised while framing, encoding or decoding protocol data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload does not fit in a frame.
    #[error("payload too long: maximum {max} bytes, got {actual}")]
    PayloadTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length supplied.
        actual: usize,
    },

    /// Frames must carry at least one payload byte.
    #[error("empty frame payload")]
    EmptyPayload,

    /// Frame type byte outside the known set.
    #[error("unknown frame type: 0x{0:02X}")]
    UnknownFrameType(u8),

    /// Frame failed marker, length or CRC validation.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// CBOR tag not present in the message catalogue.
    #[error("unknown message tag: 0x{0:06X}")]
    UnknownTag(u64),

    /// Message body did not match the layout its tag requires.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// WiFi network list did not follow the text/negint pair layout.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A field violates a size constraint of the wire format.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// Network configuration cannot be turned into a message.
    #[error("unsupported network configuration: {0}")]
    UnsupportedConfig(String),

    /// CBOR encoder failure.
    #[error("CBOR encode error: {0}")]
    Encode(String),
}

impl From<minicbor::decode::Error> for ProtocolError {
    fn from(err: minicbor::decode::Error) -> Self {
        ProtocolError::MalformedMessage(err.to_string())
    }
}

/// Result alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
