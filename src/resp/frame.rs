//! Decoded RESP frames.

use bytes::Bytes;
use std::fmt;

/// Identifier carried by every error frame.
///
/// RESP error replies are a single free-text line; no structured code is
/// split out at this layer, so all of them share this marker.
pub const ERROR_CODE: &str = "ERR";

/// RESP frame types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Simple string: +OK\r\n
    Simple(String),
    /// Error: -ERR message\r\n
    Error {
        /// Always [`ERROR_CODE`].
        code: &'static str,
        /// The full line after the `-` marker.
        message: String,
    },
    /// Integer: :1000\r\n
    Integer(i64),
    /// Bulk string: $5\r\nhello\r\n or $-1\r\n (null)
    Bulk(Option<Bytes>),
    /// Array: *2\r\n... or *-1\r\n (null)
    Array(Option<Vec<Frame>>),
}

impl Frame {
    /// Create a simple string frame
    pub fn simple<S: Into<String>>(s: S) -> Frame {
        Frame::Simple(s.into())
    }

    /// Create an error frame with the generic error code
    pub fn error<S: Into<String>>(message: S) -> Frame {
        Frame::Error {
            code: ERROR_CODE,
            message: message.into(),
        }
    }

    /// Create an integer frame
    pub fn integer(n: i64) -> Frame {
        Frame::Integer(n)
    }

    /// Create a bulk string frame
    pub fn bulk<B: Into<Bytes>>(data: B) -> Frame {
        Frame::Bulk(Some(data.into()))
    }

    /// Create a null bulk string frame
    pub fn null() -> Frame {
        Frame::Bulk(None)
    }

    /// Create an array frame
    pub fn array(frames: Vec<Frame>) -> Frame {
        Frame::Array(Some(frames))
    }

    /// Create a null array frame
    pub fn null_array() -> Frame {
        Frame::Array(None)
    }

    /// The kind of this frame, as selected by its type byte.
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Simple(_) => FrameKind::Simple,
            Frame::Error { .. } => FrameKind::Error,
            Frame::Integer(_) => FrameKind::Integer,
            Frame::Bulk(_) => FrameKind::Bulk,
            Frame::Array(_) => FrameKind::Array,
        }
    }

    /// True for the null bulk string and the null array.
    pub fn is_null(&self) -> bool {
        matches!(self, Frame::Bulk(None) | Frame::Array(None))
    }
}

/// Nested arrays are dropped with a heap stack instead of recursion, so a
/// deeply nested frame cannot exhaust the thread's stack when released.
impl Drop for Frame {
    fn drop(&mut self) {
        let Frame::Array(Some(items)) = self else {
            return;
        };
        if !items
            .iter()
            .any(|item| matches!(item, Frame::Array(Some(children)) if !children.is_empty()))
        {
            return;
        }

        let mut stack = std::mem::take(items);
        while let Some(mut frame) = stack.pop() {
            if let Frame::Array(Some(children)) = &mut frame {
                stack.append(children);
            }
        }
    }
}

/// The five RESP2 frame kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Simple,
    Error,
    Integer,
    Bulk,
    Array,
}

impl FrameKind {
    /// Map a leading type byte to its frame kind.
    pub fn from_type_byte(byte: u8) -> Option<FrameKind> {
        match byte {
            b'+' => Some(FrameKind::Simple),
            b'-' => Some(FrameKind::Error),
            b':' => Some(FrameKind::Integer),
            b'$' => Some(FrameKind::Bulk),
            b'*' => Some(FrameKind::Array),
            _ => None,
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameKind::Simple => "simple string",
            FrameKind::Error => "error",
            FrameKind::Integer => "integer",
            FrameKind::Bulk => "bulk string",
            FrameKind::Array => "array",
        };
        f.write_str(name)
    }
}

/// Renders frames the way redis-cli prints replies.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

fn render(frame: &Frame) -> String {
    match frame {
        Frame::Simple(s) => s.clone(),

        Frame::Error { message, .. } => format!("(error) {message}"),

        Frame::Integer(n) => format!("(integer) {n}"),

        Frame::Bulk(Some(data)) => match std::str::from_utf8(data) {
            Ok(s) => format!("{s:?}"),
            // binary payload, show as hex
            Err(_) => data.iter().map(|b| format!("{b:02x}")).collect(),
        },

        Frame::Bulk(None) | Frame::Array(None) => "(nil)".to_string(),

        Frame::Array(Some(items)) if items.is_empty() => "(empty array)".to_string(),

        Frame::Array(Some(items)) => {
            let mut lines = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let num = format!("{})", i + 1);
                // continuation lines of nested items line up under the first
                let pad = format!("\n{}", " ".repeat(num.len() + 1));
                lines.push(format!("{num} {}", render(item).replace('\n', &pad)));
            }
            lines.join("\n")
        }
    }
}
