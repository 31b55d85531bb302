use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Capacity of the read buffer before it first doubles.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Outcome of a single [`IncrementalReader::read`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    /// Bytes appended to the buffer by this call.
    pub read: usize,
    /// The source reported end-of-stream.
    pub eof: bool,
}

/// A byte source behind a growable buffer.
///
/// Each `read` pulls whatever the source has available right now and appends
/// it after the unconsumed bytes. When the buffer is full its capacity
/// doubles, so a header line longer than the initial capacity is still
/// assembled in one contiguous slice. Callers look at [`buffered`] and
/// release the prefix they parsed with [`consume`].
///
/// [`buffered`]: IncrementalReader::buffered
/// [`consume`]: IncrementalReader::consume
pub struct IncrementalReader<R> {
    source: R,
    buffer: BytesMut,
    capacity: usize,
}

impl<R: AsyncRead + Unpin> IncrementalReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_capacity(source, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(source: R, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            source,
            buffer: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Reads what the source has available, growing the buffer first if
    /// there is no room left.
    pub async fn read(&mut self) -> std::io::Result<Fill> {
        if self.buffer.len() >= self.capacity {
            self.capacity *= 2;
            self.buffer.reserve(self.capacity - self.buffer.len());
        }

        let room = self.capacity - self.buffer.len();
        let mut window = (&mut self.buffer).limit(room);
        let n = self.source.read_buf(&mut window).await?;

        Ok(Fill { read: n, eof: n == 0 })
    }

    /// Unconsumed bytes, oldest first.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Drops the first `n` buffered bytes.
    pub fn consume(&mut self, n: usize) {
        self.buffer.advance(n);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
