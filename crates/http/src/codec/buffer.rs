//! Fixed capacity read buffer shared by the session and the request decoder.
//!
//! The buffer is allocated once per connection and never compacted or grown.
//! `read_index` marks the end of the received bytes and `checked_index` the end of
//! the bytes already scanned by the decoder, so `checked_index <= read_index <= capacity`
//! holds at all times.

use std::ops::Range;

/// Default capacity of a connection read buffer.
pub const READ_BUFFER_SIZE: usize = 2048;

#[derive(Debug)]
pub struct ReadBuffer {
    data: Box<[u8]>,
    read_index: usize,
    checked_index: usize,
}

impl ReadBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: vec![0; capacity].into_boxed_slice(), read_index: 0, checked_index: 0 }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of bytes received so far.
    #[inline]
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// Number of bytes already examined by the decoder.
    #[inline]
    pub fn checked_index(&self) -> usize {
        self.checked_index
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.read_index == self.data.len()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.read_index
    }

    /// The received bytes, `[0, read_index)`.
    #[inline]
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.read_index]
    }

    /// The free tail of the buffer where the next read lands.
    #[inline]
    pub fn unfilled_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.read_index..]
    }

    /// Marks `n` more bytes of the free tail as received.
    #[inline]
    pub fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.remaining(), "advance past buffer capacity");
        self.read_index = (self.read_index + n).min(self.data.len());
    }

    /// Copies as much of `src` as fits and returns the number of bytes taken.
    pub fn extend_from_slice(&mut self, src: &[u8]) -> usize {
        let len = src.len().min(self.remaining());
        self.data[self.read_index..self.read_index + len].copy_from_slice(&src[..len]);
        self.read_index += len;
        len
    }

    #[inline]
    pub fn slice(&self, range: Range<usize>) -> &[u8] {
        &self.filled()[range]
    }

    #[inline]
    pub(crate) fn set_checked_index(&mut self, checked_index: usize) {
        debug_assert!(checked_index <= self.read_index, "checked index ahead of read index");
        self.checked_index = checked_index.min(self.read_index);
    }

    /// Zeroes both indices so the allocation can serve the next request.
    pub fn reset(&mut self) {
        self.read_index = 0;
        self.checked_index = 0;
    }
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::with_capacity(READ_BUFFER_SIZE)
    }
}
