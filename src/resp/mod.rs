//! Redis RESP protocol decoding.

pub mod decoder;
pub mod error;
pub mod frame;
pub mod parser;

pub use decoder::Decoder;
pub use error::DecodeError;
pub use frame::{Frame, FrameKind, ERROR_CODE};
