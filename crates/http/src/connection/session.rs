use std::io::{ErrorKind, IoSlice};

use bytes::{Bytes, BytesMut};
use http::StatusCode;
use tokio_util::codec::Encoder;
use tracing::{debug, error, info, trace, warn};

use crate::codec::{HeaderEncoder, READ_BUFFER_SIZE, ReadBuffer, RequestDecoder};
use crate::connection::{Rearm, Transport};
use crate::ensure;
use crate::protocol::{RequestHeader, Response, SessionError};
use crate::resource::ResourceResolver;
use crate::timer::TimerId;

/// Initial capacity of the buffer holding an encoded response head.
pub const WRITE_BUFFER_SIZE: usize = 1024;

/// State of one client connection between socket readiness events.
///
/// The session owns the fixed read buffer of the connection, the request decoder
/// and the response waiting to be written. The response is sent as two segments,
/// the encoded head and the content, so file content is never copied.
#[derive(Debug)]
pub struct Session {
    read_buf: ReadBuffer,
    decoder: RequestDecoder,
    write_buf: BytesMut,
    body: Bytes,
    written: usize,
    request: Option<RequestHeader>,
    keep_alive: bool,
    timer: Option<TimerId>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_capacity(READ_BUFFER_SIZE, WRITE_BUFFER_SIZE)
    }

    pub fn with_capacity(read_capacity: usize, write_capacity: usize) -> Self {
        Self {
            read_buf: ReadBuffer::with_capacity(read_capacity),
            decoder: RequestDecoder::new(),
            write_buf: BytesMut::with_capacity(write_capacity),
            body: Bytes::new(),
            written: 0,
            request: None,
            keep_alive: false,
            timer: None,
        }
    }

    /// Reads everything the transport has available into the read buffer.
    ///
    /// Stops at `WouldBlock` or once the buffer is full and returns the number of
    /// bytes read by this call.
    ///
    /// # Errors
    ///
    /// - `SessionError::PeerClosed` when the peer shut down its side
    /// - `SessionError::Capacity` when called with an already full buffer
    /// - `SessionError::Transport` for any other socket failure
    pub fn read<T: Transport + ?Sized>(&mut self, io: &mut T) -> Result<usize, SessionError> {
        ensure!(!self.read_buf.is_full(), SessionError::capacity(self.read_buf.capacity()));

        let mut total = 0;
        while !self.read_buf.is_full() {
            match io.try_read(self.read_buf.unfilled_mut()) {
                Ok(0) => return Err(SessionError::PeerClosed),
                Ok(n) => {
                    self.read_buf.advance(n);
                    total += n;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        trace!(bytes = total, buffered = self.read_buf.read_index(), "read from peer");
        Ok(total)
    }

    /// Decodes the buffered bytes and, once a request is complete or rejected,
    /// queues the response for [`write`](Self::write).
    pub fn process<R: ResourceResolver + ?Sized>(&mut self, resolver: &R) -> Rearm {
        let response = match self.decoder.decode(&mut self.read_buf) {
            Ok(None) => return Rearm::Read,
            Ok(Some(header)) => {
                let response = respond(&header, resolver);
                self.request = Some(header);
                response
            }
            Err(e) => {
                warn!(cause = %e, "bad request, connection will be closed");
                Response::error(StatusCode::BAD_REQUEST, false)
            }
        };

        self.queue(response)
    }

    /// Writes as much of the queued response as the transport accepts.
    ///
    /// # Returns
    ///
    /// - `Rearm::Write` when the socket filled up before the response was sent
    /// - `Rearm::Read` once a keep-alive response is sent, or nothing was queued
    /// - `Rearm::Close` once a response without keep-alive is sent
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Transport` if the socket fails or accepts zero bytes.
    pub fn write<T: Transport + ?Sized>(&mut self, io: &mut T) -> Result<Rearm, SessionError> {
        let head_len = self.write_buf.len();
        let total = head_len + self.body.len();
        if total == 0 {
            self.reset();
            return Ok(Rearm::Read);
        }

        while self.written < total {
            let result = if self.written < head_len {
                io.try_write_vectored(&[IoSlice::new(&self.write_buf[self.written..]), IoSlice::new(&self.body)])
            } else {
                io.try_write_vectored(&[IoSlice::new(&self.body[self.written - head_len..])])
            };

            match result {
                Ok(0) => return Err(SessionError::transport(ErrorKind::WriteZero)),
                Ok(n) => self.written += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    trace!(written = self.written, total, "peer not ready for more response bytes");
                    return Ok(Rearm::Write);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        debug!(bytes = total, keep_alive = self.keep_alive, "response sent");
        self.body = Bytes::new();
        if self.keep_alive {
            self.reset();
            Ok(Rearm::Read)
        } else {
            Ok(Rearm::Close)
        }
    }

    /// Clears all per-request state; the buffers keep their allocations.
    pub fn reset(&mut self) {
        self.read_buf.reset();
        self.decoder.reset();
        self.write_buf.clear();
        self.body = Bytes::new();
        self.written = 0;
        self.request = None;
        self.keep_alive = false;
    }

    /// The request whose response is currently queued, if any.
    pub fn request(&self) -> Option<&RequestHeader> {
        self.request.as_ref()
    }

    /// The opaque body of the current request.
    pub fn body(&self) -> Option<&[u8]> {
        self.request.as_ref().map(|request| self.read_buf.slice(request.body_range()))
    }

    /// Returns true while a response is queued and not fully written.
    pub fn has_pending_write(&self) -> bool {
        self.written < self.write_buf.len() + self.body.len()
    }

    pub fn timer(&self) -> Option<TimerId> {
        self.timer
    }

    pub fn set_timer(&mut self, timer: Option<TimerId>) {
        self.timer = timer;
    }

    fn queue(&mut self, response: Response) -> Rearm {
        let (head, body) = response.into_parts();
        self.write_buf.clear();
        if let Err(e) = HeaderEncoder.encode(head, &mut self.write_buf) {
            error!(cause = %e, "failed to encode response head");
            return Rearm::Close;
        }
        self.keep_alive = head.keep_alive();
        self.body = body;
        self.written = 0;
        Rearm::Write
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn respond<R: ResourceResolver + ?Sized>(header: &RequestHeader, resolver: &R) -> Response {
    let keep_alive = header.keep_alive();
    let response = match resolver.resolve(header.url()) {
        Ok(content) => Response::ok(content, keep_alive),
        Err(e) => {
            info!(url = header.url(), cause = %e, "can't serve resource");
            Response::error(e.status_code(), keep_alive)
        }
    };

    if header.is_head() { response.without_body() } else { response }
}
