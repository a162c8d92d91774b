//! HTTP header processing for requests and responses
//!
//! - [`HeaderDecoder`]: decodes the request line and the header fields the server understands
//! - [`HeaderEncoder`]: encodes the status line and framing headers of a response

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_decoder::HeaderLine;
pub use header_encoder::HeaderEncoder;
