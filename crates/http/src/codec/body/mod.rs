//! Request body handling
//!
//! Only Content-Length framing is supported: the [`LengthDecoder`] waits for the
//! announced number of bytes and exposes them as an opaque span of the read buffer.

mod length_decoder;

pub use length_decoder::LengthDecoder;
