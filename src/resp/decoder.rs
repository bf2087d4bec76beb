//! Incremental RESP decoder.
//!
//! One [`Decoder`] belongs to one connection. Every read from the socket is
//! handed to [`Decoder::feed`], which extracts as many complete frames as the
//! buffered bytes allow and keeps the rest for the next call.
//!
//! ## Resumable state
//!
//! Header lines and bulk payloads are consumed from the buffer as soon as
//! they are validated. Progress through a multi-step frame is kept as data:
//!
//! - `pending_bulk`: a bulk string whose length line has been read and whose
//!   payload has not fully arrived.
//! - `arrays`: one entry per open array, innermost last, holding the
//!   elements decoded so far.
//!
//! A frame suspended at any nesting depth therefore resumes exactly where
//! it stopped, without re-parsing anything.
//!
//! Because consumed components leave the buffer, the size of a partial frame
//! is tracked separately: see [`Decoder::partial_frame_bytes`].

use super::error::DecodeError;
use super::frame::Frame;
use super::parser::{self, Header, LineScanner, Progress};
use crate::buffer::Accumulator;
use tracing::{debug, trace};

/// Default cap on open arrays within one frame.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// An array whose elements are still arriving.
#[derive(Debug)]
struct ArrayProgress {
    /// Declared element count.
    expected: usize,
    /// Elements completed so far, in order.
    elements: Vec<Frame>,
}

/// Per-connection RESP decode state.
#[derive(Debug)]
pub struct Decoder {
    /// Bytes received and not yet consumed.
    buffer: Accumulator,
    /// Resumable CRLF search for the line at the front of `buffer`.
    scanner: LineScanner,
    /// Payload length of a bulk string awaiting its bytes.
    pending_bulk: Option<usize>,
    /// Open arrays, outermost first.
    arrays: Vec<ArrayProgress>,
    /// Bytes already consumed by the frame in progress.
    frame_bytes: usize,
    /// Most arrays allowed open at once (None = unlimited).
    max_depth: Option<usize>,
    /// Frames completed by the most recent `feed`.
    batch: Option<Vec<Frame>>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self {
            buffer: Accumulator::new(),
            scanner: LineScanner::new(),
            pending_bulk: None,
            arrays: Vec::new(),
            frame_bytes: 0,
            max_depth: Some(DEFAULT_MAX_DEPTH),
            batch: None,
        }
    }
}

impl Decoder {
    /// Create a decoder with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder whose buffer holds `capacity` bytes before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Accumulator::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Set the nesting limit; an array header beyond it fails with
    /// [`DecodeError::NestingTooDeep`]. `None` removes the limit.
    pub fn set_max_depth(&mut self, max_depth: Option<usize>) {
        self.max_depth = max_depth;
    }

    /// Nesting limit in effect.
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Append a chunk of received bytes and decode every complete frame.
    ///
    /// The frames are available from [`frames`](Self::frames) or
    /// [`take_frames`](Self::take_frames) until the next call. A trailing
    /// partial frame is kept for the next chunk.
    ///
    /// On a protocol error nothing decoded by this call is exposed, even
    /// frames that completed before the bad byte, and the decoder is reset:
    /// the stream cannot be resynchronized.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), DecodeError> {
        self.batch = None;
        self.buffer.append(chunk);

        let mut frames = Vec::new();
        loop {
            match self.decode_frame() {
                Ok(Progress::Complete(frame)) => {
                    trace!(kind = %frame.kind(), null = frame.is_null(), "Decoded frame");
                    frames.push(frame);
                }
                Ok(Progress::Incomplete) => break,
                Err(e) => {
                    debug!(error = %e, discarded = frames.len(), "Protocol error");
                    self.reset();
                    return Err(e);
                }
            }
        }

        if self.has_partial_frame() {
            trace!(
                pending = self.partial_frame_bytes(),
                depth = self.depth(),
                "Waiting for more data"
            );
        }

        if !frames.is_empty() {
            self.batch = Some(frames);
        }
        Ok(())
    }

    /// Feed a chunk and return the frames it completed.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<Vec<Frame>, DecodeError> {
        self.feed(chunk)?;
        Ok(self.take_frames().unwrap_or_default())
    }

    /// Frames completed by the most recent `feed`.
    ///
    /// `None` if that call completed no frame or failed.
    pub fn frames(&self) -> Option<&[Frame]> {
        self.batch.as_deref()
    }

    /// Take ownership of the frames completed by the most recent `feed`.
    pub fn take_frames(&mut self) -> Option<Vec<Frame>> {
        self.batch.take()
    }

    /// Bytes buffered and not yet consumed by a frame component.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Wire size of the unfinished frame received so far.
    ///
    /// Counts header lines and array elements already consumed as well as
    /// the bytes still buffered, so it keeps growing while a large array
    /// streams in even though `pending_bytes` stays small.
    pub fn partial_frame_bytes(&self) -> usize {
        self.frame_bytes + self.buffer.len()
    }

    /// Arrays currently open in the frame in progress.
    pub fn depth(&self) -> usize {
        self.arrays.len()
    }

    /// True if a frame has started but not finished.
    pub fn has_partial_frame(&self) -> bool {
        !self.buffer.is_empty() || self.pending_bulk.is_some() || !self.arrays.is_empty()
    }

    /// Drop all buffered bytes and partial frames.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scanner.reset();
        self.pending_bulk = None;
        self.arrays.clear();
        self.frame_bytes = 0;
        self.batch = None;
    }

    /// Decode one top-level frame, resuming any partial state.
    fn decode_frame(&mut self) -> Result<Progress<Frame>, DecodeError> {
        loop {
            let frame = match self.pending_bulk {
                Some(len) => match parser::read_bulk_payload(self.buffer.pending(), len)? {
                    Progress::Complete((data, consumed)) => {
                        self.consume(consumed);
                        self.pending_bulk = None;
                        Frame::Bulk(Some(data))
                    }
                    Progress::Incomplete => return Ok(Progress::Incomplete),
                },
                None => {
                    let (header, consumed) =
                        match parser::read_line(self.buffer.pending(), &mut self.scanner)? {
                            Progress::Complete(line) => {
                                (parser::decode_header(&line)?, line.consumed)
                            }
                            Progress::Incomplete => return Ok(Progress::Incomplete),
                        };
                    self.consume(consumed);

                    match header {
                        Header::Frame(frame) => frame,
                        Header::Bulk(len) => {
                            self.pending_bulk = Some(len);
                            continue;
                        }
                        Header::Array(count) => {
                            if let Some(limit) = self.max_depth {
                                if self.arrays.len() >= limit {
                                    return Err(DecodeError::NestingTooDeep(limit));
                                }
                            }
                            self.arrays.push(ArrayProgress {
                                expected: count,
                                elements: parser::element_storage(count),
                            });
                            continue;
                        }
                    }
                }
            };

            if let Some(frame) = self.close_arrays(frame) {
                self.frame_bytes = 0;
                return Ok(Progress::Complete(frame));
            }
        }
    }

    fn consume(&mut self, end: usize) {
        self.buffer.consume_through(end);
        self.frame_bytes += end;
    }

    /// Attach a finished frame to the innermost open array.
    ///
    /// Closes every array the frame completes and returns the result once it
    /// reaches the top level; `None` while an array is still open.
    fn close_arrays(&mut self, mut frame: Frame) -> Option<Frame> {
        loop {
            let Some(array) = self.arrays.last_mut() else {
                return Some(frame);
            };

            array.elements.push(frame);
            if array.elements.len() < array.expected {
                return None;
            }

            let elements = std::mem::take(&mut array.elements);
            self.arrays.pop();
            frame = Frame::Array(Some(elements));
        }
    }
}
