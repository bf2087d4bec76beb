//! RESP (Redis Serialization Protocol) parser.
//!
//! Stateless building blocks for the incremental decoder: CRLF scanning,
//! type byte dispatch, and the per-kind decoding of header lines and bulk
//! payloads. Each function looks at the pending bytes from the start of the
//! current frame component and either completes, reports
//! [`Progress::Incomplete`], or fails with a [`DecodeError`].
//!
//! Nothing here consumes bytes; callers advance the buffer by the reported
//! `consumed` counts once they have committed to the result.

use super::error::DecodeError;
use super::frame::{Frame, FrameKind};
use bytes::Bytes;

/// Largest element count preallocated for an array before its elements arrive.
const PREALLOC_LIMIT: usize = 1024;

/// Outcome of a decode step that did not fail.
#[derive(Debug, PartialEq, Eq)]
pub enum Progress<T> {
    /// The step finished with a value.
    Complete(T),
    /// Need more data.
    Incomplete,
}

/// Find \r\n in buffer at or after `from`, returning the position of \r.
pub fn find_crlf(buffer: &[u8], from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|pos| from + pos)
}

/// CRLF search that resumes where the previous unsuccessful search stopped.
///
/// A long line that arrives over many reads is only scanned once. The saved
/// position is relative to the start of the pending bytes, so it must be
/// reset whenever those bytes are consumed.
#[derive(Debug, Default)]
pub struct LineScanner {
    /// First index not yet ruled out as the start of a CRLF.
    resume_at: usize,
}

impl LineScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate the CRLF ending the line at the start of `buffer`.
    ///
    /// The search skips the type byte. On success the scanner is reset for
    /// the next line.
    pub fn find(&mut self, buffer: &[u8]) -> Option<usize> {
        let from = self.resume_at.max(1);
        match find_crlf(buffer, from) {
            Some(pos) => {
                self.resume_at = 0;
                Some(pos)
            }
            None => {
                // a trailing \r may still be completed by the next read
                self.resume_at = buffer.len().saturating_sub(1).max(from);
                None
            }
        }
    }

    /// Forget any saved position.
    pub fn reset(&mut self) {
        self.resume_at = 0;
    }
}

/// The leading line of a frame: type byte, payload, CRLF.
#[derive(Debug, PartialEq, Eq)]
pub struct Line<'a> {
    /// Kind selected by the type byte.
    pub kind: FrameKind,
    /// Bytes between the type byte and the CRLF.
    pub payload: &'a [u8],
    /// Bytes occupied by the whole line, CRLF included.
    pub consumed: usize,
}

/// What a header line tells the decoder to do next.
#[derive(Debug, PartialEq, Eq)]
pub enum Header {
    /// The frame is complete with its header line.
    Frame(Frame),
    /// A bulk string payload of this many bytes follows.
    Bulk(usize),
    /// This many array elements follow.
    Array(usize),
}

/// Read the type byte and the line it introduces.
///
/// An empty buffer or a missing CRLF is `Incomplete`. An unknown type byte
/// fails as soon as it is buffered, without waiting for the line end.
pub fn read_line<'a>(
    buffer: &'a [u8],
    scanner: &mut LineScanner,
) -> Result<Progress<Line<'a>>, DecodeError> {
    let Some(&type_byte) = buffer.first() else {
        return Ok(Progress::Incomplete);
    };

    let kind =
        FrameKind::from_type_byte(type_byte).ok_or(DecodeError::UnknownFrameType(type_byte))?;

    match scanner.find(buffer) {
        Some(end) => Ok(Progress::Complete(Line {
            kind,
            payload: &buffer[1..end],
            consumed: end + 2,
        })),
        None => Ok(Progress::Incomplete),
    }
}

/// Decode a complete header line according to its frame kind.
pub fn decode_header(line: &Line<'_>) -> Result<Header, DecodeError> {
    match line.kind {
        FrameKind::Simple => Ok(Header::Frame(Frame::Simple(parse_text(line.payload)))),
        FrameKind::Error => Ok(Header::Frame(Frame::error(parse_text(line.payload)))),
        FrameKind::Integer => Ok(Header::Frame(Frame::Integer(parse_integer(line.payload)?))),
        FrameKind::Bulk => match parse_length(line.payload)? {
            None => Ok(Header::Frame(Frame::Bulk(None))),
            Some(len) => Ok(Header::Bulk(len)),
        },
        FrameKind::Array => match parse_length(line.payload)? {
            None => Ok(Header::Frame(Frame::Array(None))),
            Some(0) => Ok(Header::Frame(Frame::Array(Some(Vec::new())))),
            Some(count) => Ok(Header::Array(count)),
        },
    }
}

/// Line payload as text. Invalid UTF-8 sequences become U+FFFD.
pub fn parse_text(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

/// Parse an integer payload: an optional `-` followed by decimal digits.
pub fn parse_integer(payload: &[u8]) -> Result<i64, DecodeError> {
    let digits = payload.strip_prefix(b"-").unwrap_or(payload);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(DecodeError::InvalidInteger(parse_text(payload)));
    }

    // the grammar check above leaves range as the only possible failure
    let s = std::str::from_utf8(payload)
        .map_err(|_| DecodeError::InvalidInteger(parse_text(payload)))?;
    s.parse::<i64>()
        .map_err(|_| DecodeError::IntegerOverflow(s.to_string()))
}

/// Parse a bulk string length or array count. `-1` is null.
pub fn parse_length(payload: &[u8]) -> Result<Option<usize>, DecodeError> {
    match parse_integer(payload)? {
        -1 => Ok(None),
        n if n < 0 => Err(DecodeError::InvalidLength(n)),
        n => usize::try_from(n)
            .map(Some)
            .map_err(|_| DecodeError::InvalidLength(n)),
    }
}

/// Read a bulk string payload of `len` bytes and its trailing CRLF.
///
/// Returns the payload and the bytes consumed, CRLF included.
pub fn read_bulk_payload(
    buffer: &[u8],
    len: usize,
) -> Result<Progress<(Bytes, usize)>, DecodeError> {
    let total = len.saturating_add(2);
    if buffer.len() < total {
        return Ok(Progress::Incomplete);
    }

    if &buffer[len..total] != b"\r\n" {
        return Err(DecodeError::MissingTerminator);
    }

    let data = Bytes::copy_from_slice(&buffer[..len]);
    Ok(Progress::Complete((data, total)))
}

/// Initial element storage for an array of `count` elements.
///
/// The count comes off the wire, so the up-front reservation is capped.
pub fn element_storage(count: usize) -> Vec<Frame> {
    Vec::with_capacity(count.min(PREALLOC_LIMIT))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(buffer: &[u8]) -> Line<'_> {
        match read_line(buffer, &mut LineScanner::new()) {
            Ok(Progress::Complete(line)) => line,
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"+OK\r\n", 0), Some(3));
        assert_eq!(find_crlf(b"\r\n\r\n", 1), Some(2));
        assert_eq!(find_crlf(b"+OK\r", 0), None);
        assert_eq!(find_crlf(b"", 0), None);
        assert_eq!(find_crlf(b"ab", 10), None);
    }

    #[test]
    fn test_scanner_resumes_across_reads() {
        let mut scanner = LineScanner::new();
        assert_eq!(scanner.find(b"+hello"), None);
        assert_eq!(scanner.resume_at, 5);

        // CRLF split across reads is still found
        assert_eq!(scanner.find(b"+hello\r"), None);
        assert_eq!(scanner.find(b"+hello\r\n"), Some(6));
        assert_eq!(scanner.resume_at, 0);
    }

    #[test]
    fn test_read_line() {
        let line = line(b"+OK\r\nrest");
        assert_eq!(line.kind, FrameKind::Simple);
        assert_eq!(line.payload, b"OK");
        assert_eq!(line.consumed, 5);
    }

    #[test]
    fn test_read_line_incomplete() {
        let mut scanner = LineScanner::new();
        assert_eq!(read_line(b"", &mut scanner), Ok(Progress::Incomplete));
        assert_eq!(read_line(b"+", &mut scanner), Ok(Progress::Incomplete));
        assert_eq!(read_line(b"+OK\r", &mut scanner), Ok(Progress::Incomplete));
    }

    #[test]
    fn test_read_line_unknown_type() {
        // fails on the type byte alone, before the line is complete
        let result = read_line(b"(hel", &mut LineScanner::new());
        assert_eq!(result, Err(DecodeError::UnknownFrameType(b'(')));
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer(b"1000"), Ok(1000));
        assert_eq!(parse_integer(b"-42"), Ok(-42));
        assert_eq!(parse_integer(b"0"), Ok(0));
        assert_eq!(parse_integer(b"-9223372036854775808"), Ok(i64::MIN));
        assert_eq!(parse_integer(b"9223372036854775807"), Ok(i64::MAX));
    }

    #[test]
    fn test_parse_integer_invalid() {
        let cases: [&[u8]; 8] = [b"", b"-", b"-1000.1", b"1e5", b"+5", b" 1", b"12a", b"--1"];
        for bad in cases {
            match parse_integer(bad) {
                Err(DecodeError::InvalidInteger(text)) => {
                    assert_eq!(text.as_bytes(), bad);
                }
                other => panic!("unexpected: {:?}", other),
            }
        }
    }

    #[test]
    fn test_parse_integer_overflow() {
        assert_eq!(
            parse_integer(b"9223372036854775808"),
            Err(DecodeError::IntegerOverflow("9223372036854775808".to_string()))
        );
        assert!(matches!(
            parse_integer(b"-99999999999999999999"),
            Err(DecodeError::IntegerOverflow(_))
        ));
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length(b"5"), Ok(Some(5)));
        assert_eq!(parse_length(b"0"), Ok(Some(0)));
        assert_eq!(parse_length(b"-1"), Ok(None));
        assert_eq!(parse_length(b"-2"), Err(DecodeError::InvalidLength(-2)));
        assert!(matches!(parse_length(b"x"), Err(DecodeError::InvalidInteger(_))));
    }

    #[test]
    fn test_decode_header() {
        assert_eq!(
            decode_header(&line(b"+OK\r\n")),
            Ok(Header::Frame(Frame::simple("OK")))
        );
        assert_eq!(
            decode_header(&line(b"-ERR unknown command\r\n")),
            Ok(Header::Frame(Frame::error("ERR unknown command")))
        );
        assert_eq!(
            decode_header(&line(b":1000\r\n")),
            Ok(Header::Frame(Frame::integer(1000)))
        );
        assert_eq!(decode_header(&line(b"$5\r\n")), Ok(Header::Bulk(5)));
        assert_eq!(
            decode_header(&line(b"$-1\r\n")),
            Ok(Header::Frame(Frame::null()))
        );
        assert_eq!(decode_header(&line(b"*2\r\n")), Ok(Header::Array(2)));
        assert_eq!(
            decode_header(&line(b"*0\r\n")),
            Ok(Header::Frame(Frame::array(vec![])))
        );
        assert_eq!(
            decode_header(&line(b"*-1\r\n")),
            Ok(Header::Frame(Frame::null_array()))
        );
    }

    #[test]
    fn test_simple_string_invalid_utf8_is_lossy() {
        match decode_header(&line(b"+a\xffb\r\n")) {
            Ok(Header::Frame(Frame::Simple(ref s))) => assert_eq!(s, "a\u{fffd}b"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_read_bulk_payload() {
        match read_bulk_payload(b"hello\r\n+OK\r\n", 5) {
            Ok(Progress::Complete((data, consumed))) => {
                assert_eq!(&data[..], b"hello");
                assert_eq!(consumed, 7);
            }
            other => panic!("unexpected: {:?}", other),
        }

        // payload bytes are opaque, CRLF inside is fine
        match read_bulk_payload(b"a\r\nb\r\n", 4) {
            Ok(Progress::Complete((data, _))) => assert_eq!(&data[..], b"a\r\nb"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_read_bulk_payload_incomplete() {
        assert_eq!(read_bulk_payload(b"hel", 5), Ok(Progress::Incomplete));
        assert_eq!(read_bulk_payload(b"hello\r", 5), Ok(Progress::Incomplete));
        assert_eq!(read_bulk_payload(b"", 0), Ok(Progress::Incomplete));
    }

    #[test]
    fn test_read_bulk_payload_missing_terminator() {
        assert_eq!(
            read_bulk_payload(b"helloXY", 5),
            Err(DecodeError::MissingTerminator)
        );
    }

    #[test]
    fn test_element_storage_is_capped() {
        assert!(element_storage(3).capacity() >= 3);
        assert!(element_storage(usize::MAX).capacity() >= PREALLOC_LIMIT);
        assert!(element_storage(usize::MAX).capacity() < usize::MAX);
    }
}
