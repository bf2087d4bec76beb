//! Byte accumulator for partially received protocol data.
//!
//! Bytes arrive from the transport in arbitrary chunks. The accumulator keeps
//! everything that has not yet been turned into a frame in a single growable
//! arena, with a read offset separating consumed bytes from pending ones.
//!
//! ## Compaction
//!
//! Consuming bytes only moves the read offset. The consumed prefix is
//! reclaimed lazily on the next `append`, once it is both larger than
//! `COMPACT_THRESHOLD` and at least half of the arena. A fully drained
//! arena is reset in place, which costs nothing.

/// Consumed bytes tolerated at the front of the arena before compacting.
const COMPACT_THRESHOLD: usize = 4 * 1024;

/// Growable byte arena with a read cursor.
#[derive(Debug, Default)]
pub struct Accumulator {
    /// Backing storage. Bytes before `read` are already consumed.
    data: Vec<u8>,
    /// Offset of the first pending byte.
    read: usize,
}

impl Accumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an accumulator with room for `capacity` bytes before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            read: 0,
        }
    }

    /// Append newly received bytes after the pending tail.
    pub fn append(&mut self, bytes: &[u8]) {
        self.compact();
        // Vec growth is amortized (doubling), so no per-append reallocation.
        self.data.extend_from_slice(bytes);
    }

    /// View pending bytes starting `offset` bytes past the read cursor.
    ///
    /// Returns an empty slice if `offset` is beyond the pending data.
    pub fn peek_from(&self, offset: usize) -> &[u8] {
        let start = self.read.saturating_add(offset).min(self.data.len());
        &self.data[start..]
    }

    /// Pending bytes, from the read cursor to the end.
    pub fn pending(&self) -> &[u8] {
        &self.data[self.read..]
    }

    /// Discard the first `end` pending bytes.
    ///
    /// # Panics
    /// Panics if `end` exceeds the number of pending bytes (debug builds only).
    pub fn consume_through(&mut self, end: usize) {
        debug_assert!(end <= self.len(), "consume past end of pending data");
        self.read = (self.read + end).min(self.data.len());
        if self.read == self.data.len() {
            self.data.clear();
            self.read = 0;
        }
    }

    /// Number of pending bytes.
    pub fn len(&self) -> usize {
        self.data.len() - self.read
    }

    /// Check if there are no pending bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all pending bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
        self.read = 0;
    }

    /// Reclaim the consumed prefix once it dominates the arena.
    fn compact(&mut self) {
        if self.read >= COMPACT_THRESHOLD && self.read * 2 >= self.data.len() {
            self.data.drain(..self.read);
            self.read = 0;
        }
    }
}
