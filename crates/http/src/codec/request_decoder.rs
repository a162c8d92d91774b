//! HTTP request decoder module
//!
//! Drives the line scanner and feeds every complete line to the handler of the
//! current state until the request is complete, rejected, or more data is needed.
//!
//! # State Machine
//!
//! ```text
//! RequestLine --line--> Headers --blank line--> done
//!                          |
//!                          +--blank line, Content-Length > 0--> Content --all bytes--> done
//! ```
//!
//! # Example
//!
//! ```
//! use micro_httpd::codec::{ReadBuffer, RequestDecoder};
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = ReadBuffer::with_capacity(2048);
//!
//! buffer.extend_from_slice(b"GET /index.html HTTP/1.1\r\nHost: a\r\n");
//! assert!(decoder.decode(&mut buffer).unwrap().is_none());
//!
//! buffer.extend_from_slice(b"\r\n");
//! let header = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(header.url(), "/index.html");
//! ```

use std::mem;

use tracing::trace;

use crate::codec::body::LengthDecoder;
use crate::codec::buffer::ReadBuffer;
use crate::codec::header::{HeaderDecoder, HeaderLine};
use crate::codec::line::{LineScanner, LineStatus};
use crate::ensure;
use crate::protocol::{ParseError, RequestHeader};

#[derive(Debug, Default)]
enum DecodeState {
    #[default]
    RequestLine,
    Headers(RequestHeader),
    Content(RequestHeader, LengthDecoder),
}

/// A decoder for HTTP requests held in a [`ReadBuffer`]
///
/// The decoder keeps its progress between calls, so it can be invoked after every
/// read with whatever has arrived so far.
#[derive(Debug, Default)]
pub struct RequestDecoder {
    scanner: LineScanner,
    header_decoder: HeaderDecoder,
    state: DecodeState,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the decoder to its initial state for the next request on the connection.
    pub fn reset(&mut self) {
        self.scanner.reset();
        self.state = DecodeState::RequestLine;
    }

    /// Attempts to decode a request from the bytes received so far
    ///
    /// # Returns
    ///
    /// - `Ok(Some(header))`: the request is complete
    /// - `Ok(None)`: need more data to proceed
    ///
    /// # Errors
    ///
    /// Returns `ParseError` for any malformed input and `ParseError::TooLarge` once
    /// the buffer is full without a complete request.
    pub fn decode(&mut self, buf: &mut ReadBuffer) -> Result<Option<RequestHeader>, ParseError> {
        loop {
            if let DecodeState::Content(_, length_decoder) = &self.state {
                let Some(body) = length_decoder.decode(buf) else {
                    ensure!(!buf.is_full(), ParseError::too_large(buf.capacity()));
                    return Ok(None);
                };
                let DecodeState::Content(mut header, _) = mem::take(&mut self.state) else {
                    unreachable!("state checked above");
                };
                header.set_body(body);
                return Ok(Some(header));
            }

            let line = match self.scanner.scan(buf) {
                LineStatus::Complete(line) => line,
                LineStatus::Incomplete => {
                    ensure!(!buf.is_full(), ParseError::too_large(buf.capacity()));
                    return Ok(None);
                }
                LineStatus::Malformed(offset) => return Err(ParseError::malformed_line(offset)),
            };
            let text = buf.slice(line);
            trace!(line = %String::from_utf8_lossy(text), "got http line");

            match mem::take(&mut self.state) {
                DecodeState::RequestLine => {
                    self.state = DecodeState::Headers(self.header_decoder.decode_request_line(text)?);
                }
                DecodeState::Headers(mut header) => match self.header_decoder.decode_field(&mut header, text)? {
                    HeaderLine::Field => self.state = DecodeState::Headers(header),
                    HeaderLine::End => {
                        let body_start = buf.checked_index();
                        if header.is_head() || header.content_length() == 0 {
                            header.set_body(body_start..body_start);
                            return Ok(Some(header));
                        }
                        let length_decoder = LengthDecoder::new(body_start, header.content_length(), buf)?;
                        self.state = DecodeState::Content(header, length_decoder);
                    }
                },
                DecodeState::Content(..) => unreachable!("content is decoded before scanning lines"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use indoc::indoc;

    /// Converts an `indoc` literal with `\n` line endings to the wire form.
    fn wire(request: &str) -> Vec<u8> {
        request.replace('\n', "\r\n").into_bytes()
    }

    fn decode_whole(bytes: &[u8], capacity: usize) -> Result<Option<RequestHeader>, ParseError> {
        let mut buf = ReadBuffer::with_capacity(capacity);
        buf.extend_from_slice(bytes);
        RequestDecoder::new().decode(&mut buf)
    }

    /// Feeds `bytes` in the given chunks, decoding after each one like a session would.
    fn decode_chunked(bytes: &[u8], chunks: &[usize], capacity: usize) -> Result<Option<RequestHeader>, ParseError> {
        let mut buf = ReadBuffer::with_capacity(capacity);
        let mut decoder = RequestDecoder::new();
        let mut offset = 0;
        for &len in chunks.iter().chain(std::iter::once(&usize::MAX)) {
            let end = offset + len.min(bytes.len() - offset);
            buf.extend_from_slice(&bytes[offset..end]);
            offset = end;
            match decoder.decode(&mut buf) {
                Ok(None) if offset < bytes.len() => continue,
                result => return result,
            }
        }
        unreachable!("the final chunk always returns")
    }

    #[test]
    fn keep_alive_round_trip() {
        let header = decode_whole(b"GET /x HTTP/1.1\r\nHost: a\r\nConnection: keep-alive\r\n\r\n", 2048).unwrap().unwrap();
        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.url(), "/x");
        assert_eq!(header.host(), Some("a"));
        assert!(header.keep_alive());
        assert_eq!(header.content_length(), 0);
    }

    #[test]
    fn from_curl() {
        let request = wire(indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##});

        let header = decode_whole(&request, 2048).unwrap().unwrap();
        assert_eq!(header.url(), "/index.html");
        assert_eq!(header.host(), Some("127.0.0.1:8080"));
        assert!(!header.keep_alive());
        assert_eq!(header.body_range(), request.len()..request.len());
    }

    #[test]
    fn http_10_is_bad_request() {
        assert!(matches!(decode_whole(b"GET / HTTP/1.0\r\n\r\n", 2048), Err(ParseError::InvalidVersion { .. })));
    }

    #[test]
    fn missing_blank_line_needs_more_data() {
        assert_eq!(decode_whole(b"GET / HTTP/1.1\r\nHost: a\r\nAccept: */*\r\n", 2048), Ok(None));
        assert_eq!(decode_whole(b"GET / HTTP/1.1\r\nHost: a\r\nAcc", 2048), Ok(None));
    }

    #[test]
    fn content_length_waits_for_body() {
        let head = b"GET /form HTTP/1.1\r\nContent-Length: 5\r\n\r\n";
        let mut buf = ReadBuffer::with_capacity(2048);
        let mut decoder = RequestDecoder::new();

        buf.extend_from_slice(head);
        assert_eq!(decoder.decode(&mut buf), Ok(None));

        buf.extend_from_slice(b"1234");
        assert_eq!(decoder.decode(&mut buf), Ok(None));

        buf.extend_from_slice(b"5");
        let header = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(header.content_length(), 5);
        assert_eq!(buf.slice(header.body_range()), b"12345");
    }

    #[test]
    fn head_ignores_content_length() {
        let header = decode_whole(b"HEAD / HTTP/1.1\r\nContent-Length: 5\r\n\r\n", 2048).unwrap().unwrap();
        assert!(header.is_head());
        assert!(header.body_range().is_empty());
    }

    #[test]
    fn exactly_full_buffer_without_terminator_is_too_large() {
        let capacity = 32;
        let request = b"GET /aaaaaaaaaaaaaaaaaaaaaaaaaaa";
        assert_eq!(request.len(), capacity);
        assert_eq!(decode_whole(request, capacity), Err(ParseError::too_large(capacity)));
        assert_eq!(decode_whole(&request[..capacity - 1], capacity), Ok(None));
    }

    #[test]
    fn full_buffer_with_partial_body_is_too_large() {
        let request = b"GET / HTTP/1.1\r\nContent-Length: 10\r\n\r\n12345";
        assert_eq!(decode_whole(request, request.len()), Err(ParseError::too_large(request.len())));
        assert_eq!(decode_whole(request, request.len() + 4), Err(ParseError::too_large(request.len() + 4)));
        assert_eq!(decode_whole(request, request.len() + 5), Ok(None));
    }

    #[test]
    fn malformed_terminator_is_bad_request() {
        assert_eq!(decode_whole(b"GET / HTTP/1.1\nHost: a\r\n\r\n", 2048), Err(ParseError::malformed_line(14)));
    }

    #[test]
    fn reset_allows_next_request() {
        let mut buf = ReadBuffer::with_capacity(2048);
        let mut decoder = RequestDecoder::new();

        buf.extend_from_slice(b"GET /a HTTP/1.1\r\n\r\n");
        assert_eq!(decoder.decode(&mut buf).unwrap().unwrap().url(), "/a");

        buf.reset();
        decoder.reset();
        buf.extend_from_slice(b"GET /b HTTP/1.1\r\n\r\n");
        assert_eq!(decoder.decode(&mut buf).unwrap().unwrap().url(), "/b");
    }

    #[test]
    fn chunking_invariance() {
        let requests: [&[u8]; 7] = [
            b"GET /x HTTP/1.1\r\nHost: a\r\nConnection: keep-alive\r\n\r\n",
            b"GET http://host/y HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello",
            b"HEAD /z HTTP/1.1\r\nHost:  b \r\n\r\n",
            b"GET / HTTP/1.0\r\n\r\n",
            b"GET / HTTP/1.1\r\nHost: a\rx\r\n\r\n",
            b"GET / HTTP/1.1\r\n\n",
            b"PUT / HTTP/1.1\r\n\r\n",
        ];

        for request in requests {
            let expected = decode_whole(request, 256);
            assert!(!matches!(expected, Ok(None)), "fixture must be terminal");

            for split in 1..request.len() {
                assert_eq!(decode_chunked(request, &[split], 256), expected, "split at {split}");
            }
            let bytes = vec![1; request.len()];
            assert_eq!(decode_chunked(request, &bytes, 256), expected, "byte by byte");
            for (first, second) in [(1, 2), (3, 5), (7, 11)] {
                assert_eq!(decode_chunked(request, &[first, second], 256), expected, "splits {first}/{second}");
            }
        }
    }
}
