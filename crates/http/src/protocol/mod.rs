//! Core HTTP protocol types shared by the codec and the connection session.
//!
//! - **Request** ([`request`]): [`RequestHeader`], the decoded request line and the
//!   handful of headers the server understands
//! - **Response** ([`response`]): [`ResponseHead`] and [`Response`], the status line,
//!   framing headers and body segment of an outgoing response
//! - **Errors** ([`error`]):
//!   - [`ParseError`]: request decoding errors, always answered with 400
//!   - [`ResourceError`]: resolution failures, mapped to 404/403/400/500
//!   - [`SessionError`]: transport failures that end a session without a response

mod request;
pub use request::RequestHeader;

mod response;
pub use response::EMPTY_FILE_PAGE;
pub use response::Response;
pub use response::ResponseHead;

mod error;
pub use error::ParseError;
pub use error::ResourceError;
pub use error::SessionError;
