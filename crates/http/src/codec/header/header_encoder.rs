//! HTTP header encoder implementation for serializing response heads
//!
//! The encoded head is the first segment of the scatter write that sends a
//! response; the body travels as a second, separate segment and is never copied
//! into the head buffer.

use crate::protocol::ResponseHead;

use bytes::{BufMut, BytesMut};

use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;

/// Initial buffer size reserved for header serialization
const INIT_HEADER_SIZE: usize = 128;

/// Encoder for HTTP response heads implementing the [`Encoder`] trait.
///
/// Writes the status line followed by `Content-Length`, `Connection` and the
/// blank line that ends the header section.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderEncoder;

impl Encoder<ResponseHead> for HeaderEncoder {
    type Error = io::Error;

    fn encode(&mut self, head: ResponseHead, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(INIT_HEADER_SIZE);

        let status = head.status();
        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or("Unknown"))?;
        write!(FastWrite(dst), "Content-Length: {}\r\n", head.content_length())?;
        dst.put_slice(if head.keep_alive() { b"Connection: keep-alive\r\n" } else { b"Connection: close\r\n" });
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Fast writer implementation for writing to BytesMut.
///
/// This is an optimization to avoid unnecessary bounds checking when writing
/// to the bytes buffer, since we've already reserved enough space.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn keep_alive_ok() {
        let mut dst = BytesMut::new();
        HeaderEncoder.encode(ResponseHead::new(StatusCode::OK, 12, true), &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\nContent-Length: 12\r\nConnection: keep-alive\r\n\r\n");
    }

    #[test]
    fn close_not_found() {
        let mut dst = BytesMut::new();
        HeaderEncoder.encode(ResponseHead::new(StatusCode::NOT_FOUND, 0, false), &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    }
}
