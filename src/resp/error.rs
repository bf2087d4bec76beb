//! Error types for RESP decoding.

/// Protocol violation found while decoding a byte stream.
///
/// Every variant is fatal for the stream: the bytes cannot be resynchronized,
/// so the connection layer is expected to drop or reset the connection.
/// Running out of buffered bytes is never an error; see
/// [`Progress::Incomplete`](super::parser::Progress::Incomplete).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Leading byte is not one of `+ - : $ *`.
    #[error("unknown frame type: {0:#04x}")]
    UnknownFrameType(u8),

    /// Integer payload is not an optional `-` followed by decimal digits.
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    /// Integer payload is well formed but does not fit in an `i64`.
    #[error("integer overflow: {0}")]
    IntegerOverflow(String),

    /// Bulk string or array length is negative and not the null marker `-1`.
    #[error("invalid length: {0}")]
    InvalidLength(i64),

    /// Bulk string payload is not followed by CRLF.
    #[error("bulk string missing trailing CRLF")]
    MissingTerminator,

    /// An array header would open more nested arrays than the decoder allows.
    #[error("array nesting deeper than {0} levels")]
    NestingTooDeep(usize),
}
