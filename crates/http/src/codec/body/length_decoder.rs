//! Completion check for request bodies framed by a Content-Length header.
//!
//! The body is not interpreted. The decoder only waits until the announced number
//! of bytes sits in the read buffer after the header section, then reports where
//! those bytes are.

use std::ops::Range;

use crate::codec::buffer::ReadBuffer;
use crate::ensure;
use crate::protocol::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    /// Offset of the first body byte, right after the blank line
    body_start: usize,
    /// The number of body bytes announced by Content-Length
    length: usize,
}

impl LengthDecoder {
    /// Creates a decoder for a body starting at `body_start`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::TooLarge` if the body can never fit into the buffer, so the
    /// request is rejected before the client spends time sending it.
    pub fn new(body_start: usize, length: u64, buf: &ReadBuffer) -> Result<Self, ParseError> {
        let length = usize::try_from(length).map_err(|_e| ParseError::too_large(buf.capacity()))?;
        let end = body_start.checked_add(length);
        ensure!(end.is_some_and(|end| end <= buf.capacity()), ParseError::too_large(buf.capacity()));
        Ok(Self { body_start, length })
    }

    /// Returns the body span once every byte of it has been received.
    pub fn decode(&self, buf: &mut ReadBuffer) -> Option<Range<usize>> {
        let end = self.body_start + self.length;
        if buf.read_index() < end {
            buf.set_checked_index(buf.read_index());
            return None;
        }

        buf.set_checked_index(end);
        Some(self.body_start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_for_all_bytes() {
        let mut buf = ReadBuffer::with_capacity(32);
        buf.extend_from_slice(b"header\r\n\r\n123");

        let decoder = LengthDecoder::new(10, 5, &buf).unwrap();
        assert_eq!(decoder.decode(&mut buf), None);
        assert_eq!(buf.checked_index(), 13);

        buf.extend_from_slice(b"45");
        assert_eq!(decoder.decode(&mut buf), Some(10..15));
        assert_eq!(buf.slice(10..15), b"12345");
        assert_eq!(buf.checked_index(), 15);
    }

    #[test]
    fn rejects_body_larger_than_buffer() {
        let buf = ReadBuffer::with_capacity(16);
        assert_eq!(LengthDecoder::new(10, 7, &buf), Err(ParseError::too_large(16)));
        assert!(LengthDecoder::new(10, 6, &buf).is_ok());
        assert_eq!(LengthDecoder::new(10, u64::MAX, &buf), Err(ParseError::too_large(16)));
    }
}
