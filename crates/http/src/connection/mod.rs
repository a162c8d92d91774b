//! HTTP connection handling module
//!
//! A [`Session`] is the per-connection state machine. It never waits on the
//! socket itself: each step returns a [`Rearm`] telling the owner which readiness
//! to wait for before calling the next step.
//!
//! # Components
//!
//! - [`Session`]: read buffer, request decoder and the pending response
//! - [`Transport`]: the non-blocking socket seam used by the session

mod session;
mod transport;

pub use session::Session;
pub use session::WRITE_BUFFER_SIZE;
pub use transport::Transport;

/// The single readiness interest a session asks for after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rearm {
    /// Wait until the peer sends more bytes.
    Read,
    /// Wait until the socket accepts more bytes of the pending response.
    Write,
    /// The connection is finished and should be dropped.
    Close,
}
