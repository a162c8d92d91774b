//! A micro HTTP/1.1 static file server core
//!
//! This crate holds everything of the server that does not touch a runtime: the
//! resumable request decoder, the per-connection session, resource resolution and
//! the idle timer stores. The `micro-httpd-server` crate drives it with tokio.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use micro_httpd::connection::{Rearm, Session};
//! use micro_httpd::protocol::ResourceError;
//! use micro_httpd::resource::ResourceResolver;
//!
//! struct Hello;
//!
//! impl ResourceResolver for Hello {
//!     fn resolve(&self, _url: &str) -> Result<Bytes, ResourceError> {
//!         Ok(Bytes::from_static(b"Hello World!\r\n"))
//!     }
//! }
//!
//! # struct Pipe<'a>(&'a [u8], &'a mut Vec<u8>);
//! # impl micro_httpd::connection::Transport for Pipe<'_> {
//! #     fn try_read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
//! #         if self.0.is_empty() { return Err(std::io::ErrorKind::WouldBlock.into()); }
//! #         std::io::Read::read(&mut self.0, buf)
//! #     }
//! #     fn try_write_vectored(&mut self, bufs: &[std::io::IoSlice<'_>]) -> std::io::Result<usize> {
//! #         std::io::Write::write_vectored(self.1, bufs)
//! #     }
//! # }
//! let mut response = Vec::new();
//! let mut pipe = Pipe(b"GET /hello HTTP/1.1\r\nConnection: keep-alive\r\n\r\n", &mut response);
//!
//! let mut session = Session::new();
//! session.read(&mut pipe).unwrap();
//! assert_eq!(session.process(&Hello), Rearm::Write);
//! assert_eq!(session.write(&mut pipe).unwrap(), Rearm::Read);
//! assert!(response.ends_with(b"\r\n\r\nHello World!\r\n"));
//! ```
//!
//! # Architecture
//!
//! - [`codec`]: read buffer, line scanner, request decoder and response head encoder
//! - [`connection`]: the session state machine and its transport seam
//! - [`protocol`]: request and response types and the error enums
//! - [`resource`]: url to content resolution against a document root
//! - [`timer`]: sorted list, time wheel and min-heap deadline stores
//!
//! # Error Handling
//!
//! - [`protocol::ParseError`]: the request is rejected with `400` and the connection closed
//! - [`protocol::ResourceError`]: answered with `404`, `403`, `400` or `500`, keep-alive honoured
//! - [`protocol::SessionError`]: the connection is dropped without a response
//!
//! # Limitations
//!
//! - Only `GET` and `HEAD` over `HTTP/1.1`
//! - A request must fit the connection's read buffer, 2KB by default
//! - Request bodies are framed by `Content-Length` only and never interpreted

pub mod codec;
pub mod connection;
pub mod protocol;
pub mod resource;
pub mod timer;

mod utils;
pub(crate) use utils::ensure;
