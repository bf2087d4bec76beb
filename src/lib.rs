//! resp-stream: incremental decoding of the Redis wire protocol.
//!
//! Turns a byte stream that arrives in arbitrary chunks into typed RESP
//! frames:
//! - `+` simple strings, `-` errors, `:` integers
//! - `$` bulk strings and `*` arrays, including nulls and nesting
//!
//! The core is [`Decoder`], a synchronous state machine owned by a single
//! connection. [`FrameReader`] drives one from any `tokio::io::AsyncRead`.

pub mod buffer;
pub mod connection;
pub mod resp;

pub use connection::{FrameReader, ReaderConfig, ReaderError};
pub use resp::{DecodeError, Decoder, Frame, FrameKind};
