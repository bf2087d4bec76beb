//! Connection-side driver for the decoder.
//!
//! [`FrameReader`] owns one [`Decoder`] and the read half of a connection.
//! It pulls chunks from the socket, feeds them to the decoder, and hands out
//! frames in arrival order. Policies the decoder leaves to the transport
//! live here:
//! - a cap on the size of a frame that never completes
//! - a cap on array nesting
//! - detecting a connection closed in the middle of a frame

use crate::resp::decoder::DEFAULT_MAX_DEPTH;
use crate::resp::{DecodeError, Decoder, Frame};
use bytes::BytesMut;
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace, warn};

/// Default size of each socket read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 16 * 1024;

/// Default cap on the bytes received for an incomplete frame.
pub const DEFAULT_MAX_PENDING_BYTES: usize = 512 * 1024 * 1024;

/// Default cap on nested arrays within one frame.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = DEFAULT_MAX_DEPTH;

/// Tuning for a [`FrameReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Bytes requested from the socket per read.
    pub read_buffer_size: usize,
    /// Maximum bytes received for an incomplete frame (None = unlimited).
    pub max_pending_bytes: Option<usize>,
    /// Maximum arrays open at once within a frame (None = unlimited).
    pub max_nesting_depth: Option<usize>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_pending_bytes: Some(DEFAULT_MAX_PENDING_BYTES),
            max_nesting_depth: Some(DEFAULT_MAX_NESTING_DEPTH),
        }
    }
}

/// Errors surfaced while reading frames from a connection.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// Reading from the underlying stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer sent bytes that are not valid RESP.
    #[error("protocol error: {0}")]
    Decode(#[from] DecodeError),

    /// An incomplete frame grew past the configured limit.
    #[error("pending data exceeds limit: {pending} bytes received, limit is {limit}")]
    PendingLimitExceeded { pending: usize, limit: usize },

    /// The peer closed the connection in the middle of a frame.
    #[error("connection closed with {pending} bytes of an incomplete frame")]
    TruncatedFrame { pending: usize },
}

/// Reads RESP frames from an async byte stream.
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: R,
    decoder: Decoder,
    /// Scratch buffer for a single socket read.
    read_buf: BytesMut,
    /// Frames decoded but not yet returned by `read_frame`.
    queue: VecDeque<Frame>,
    config: ReaderConfig,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Create a reader with default settings.
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, ReaderConfig::default())
    }

    /// Create a reader with explicit settings.
    pub fn with_config(reader: R, config: ReaderConfig) -> Self {
        let mut decoder = Decoder::with_capacity(config.read_buffer_size);
        decoder.set_max_depth(config.max_nesting_depth);

        Self {
            reader,
            decoder,
            read_buf: BytesMut::with_capacity(config.read_buffer_size),
            queue: VecDeque::new(),
            config,
        }
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` when the peer closes the connection between frames.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ReaderError> {
        if let Some(frame) = self.queue.pop_front() {
            return Ok(Some(frame));
        }

        match self.read_batch().await? {
            Some(batch) => {
                self.queue.extend(batch);
                Ok(self.queue.pop_front())
            }
            None => Ok(None),
        }
    }

    /// Read the next non-empty batch of frames.
    ///
    /// Frames already queued by `read_frame` are returned first. Otherwise
    /// this keeps reading until at least one frame completes.
    pub async fn read_batch(&mut self) -> Result<Option<Vec<Frame>>, ReaderError> {
        if !self.queue.is_empty() {
            return Ok(Some(self.queue.drain(..).collect()));
        }

        loop {
            if !self.fill().await? {
                if self.decoder.has_partial_frame() {
                    let pending = self.decoder.partial_frame_bytes();
                    debug!(pending, "Connection closed mid-frame");
                    self.decoder.reset();
                    return Err(ReaderError::TruncatedFrame { pending });
                }
                trace!("Connection closed by peer");
                return Ok(None);
            }

            if let Some(batch) = self.decoder.take_frames() {
                return Ok(Some(batch));
            }
        }
    }

    /// The decoder driven by this reader.
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Settings in use.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Reference to the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Release the underlying stream, dropping any buffered data.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read one chunk and feed it to the decoder. Returns false at EOF.
    async fn fill(&mut self) -> Result<bool, ReaderError> {
        self.read_buf.clear();
        self.read_buf.reserve(self.config.read_buffer_size);

        let n = self.reader.read_buf(&mut self.read_buf).await?;
        if n == 0 {
            return Ok(false);
        }
        trace!(bytes = n, "Read chunk");

        self.decoder.feed(&self.read_buf)?;
        self.check_pending_limit()?;
        Ok(true)
    }

    fn check_pending_limit(&mut self) -> Result<(), ReaderError> {
        let Some(limit) = self.config.max_pending_bytes else {
            return Ok(());
        };

        let pending = self.decoder.partial_frame_bytes();
        if pending > limit {
            warn!(pending, limit, "Incomplete frame exceeds pending limit");
            self.decoder.reset();
            return Err(ReaderError::PendingLimitExceeded { pending, limit });
        }
        Ok(())
    }
}
