//! HTTP codec module for decoding requests and encoding response heads
//!
//! Decoding works directly on the connection's fixed [`ReadBuffer`] and is
//! resumable: every call continues from where the previous one stopped.
//!
//! # Architecture
//!
//! - Request handling:
//!   - [`LineScanner`]: finds CRLF-terminated lines
//!   - [`RequestDecoder`]: the request line / headers / content state machine
//!   - Header parsing via [`header`] module
//!   - Content-Length completion via [`body`] module
//!
//! - Response handling:
//!   - [`HeaderEncoder`]: encodes the status line and framing headers

mod body;
mod buffer;
mod header;
mod line;
mod request_decoder;

pub use buffer::READ_BUFFER_SIZE;
pub use buffer::ReadBuffer;
pub use header::HeaderEncoder;
pub use line::LineScanner;
pub use line::LineStatus;
pub use request_decoder::RequestDecoder;
