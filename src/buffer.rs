//! Byte cursor buffers an upload session reads from.
//!
//! The session never owns the bytes it parses. It peeks at whatever is
//! buffered, consumes what it used, and compacts once per pass so memory use
//! follows the bytes in flight rather than the size of the body.

use std::fmt;

const INITIAL_CAPACITY: usize = 1024 * 4;

/// A buffer with a read cursor.
pub trait BodyBuffer {
    /// The buffered bytes that have not been consumed yet.
    fn peek(&self) -> &[u8];

    /// Advance the read cursor by `amt` bytes.
    ///
    /// # Panics
    ///
    /// Implementations may panic if `amt` exceeds the buffered length.
    fn consume(&mut self, amt: usize);

    /// Release consumed bytes from the front of the buffer.
    fn compact(&mut self);

    /// How many unread bytes are buffered.
    fn len(&self) -> usize {
        self.peek().len()
    }

    /// Whether no unread bytes are buffered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A growable byte buffer with a read and a write cursor.
///
/// Bytes are appended at the end and consumed from the front; [`compact`]
/// moves the unread tail back to the start.
///
/// [`compact`]: BodyBuffer::compact
pub struct RingBuffer {
    data: Vec<u8>,
    /// Read position into `data`.
    start: usize,
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("start", &self.start)
            .field("len", &self.len())
            .finish()
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }
}

impl RingBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            start: 0,
        }
    }

    /// Append bytes behind whatever is buffered.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Total bytes held, consumed or not.
    pub fn capacity_used(&self) -> usize {
        self.data.len()
    }
}

impl BodyBuffer for RingBuffer {
    fn peek(&self) -> &[u8] {
        &self.data[self.start..]
    }

    fn consume(&mut self, amt: usize) {
        assert!(
            self.start + amt <= self.data.len(),
            "consumed past the end of the buffer"
        );
        self.start += amt;
    }

    fn compact(&mut self) {
        if self.start == 0 {
            return;
        }
        self.data.drain(..self.start);
        self.start = 0;
    }
}
