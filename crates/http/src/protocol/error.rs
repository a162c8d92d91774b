use http::StatusCode;
use std::io;
use thiserror::Error;

/// Errors raised while decoding a request. Every variant is answered with `400 Bad Request`
/// and the connection is closed afterwards.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed line terminator at offset {offset}")]
    MalformedLine { offset: usize },

    #[error("invalid request line: {reason}")]
    InvalidRequestLine { reason: &'static str },

    #[error("invalid http method: {method}")]
    InvalidMethod { method: String },

    #[error("invalid http version: {version}")]
    InvalidVersion { version: String },

    #[error("invalid http uri: {uri}")]
    InvalidUri { uri: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("request exceeds read buffer capacity {capacity}")]
    TooLarge { capacity: usize },
}

impl ParseError {
    pub fn malformed_line(offset: usize) -> Self {
        Self::MalformedLine { offset }
    }

    pub fn invalid_request_line(reason: &'static str) -> Self {
        Self::InvalidRequestLine { reason }
    }

    pub fn invalid_method<S: ToString>(method: S) -> Self {
        Self::InvalidMethod { method: method.to_string() }
    }

    pub fn invalid_version<S: ToString>(version: S) -> Self {
        Self::InvalidVersion { version: version.to_string() }
    }

    pub fn invalid_uri<S: ToString>(uri: S) -> Self {
        Self::InvalidUri { uri: uri.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn too_large(capacity: usize) -> Self {
        Self::TooLarge { capacity }
    }

    /// Returns true if the request was rejected only because it did not fit the read buffer
    #[inline]
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::TooLarge { .. })
    }
}

/// Outcomes of resolving a parsed url against the served resources.
///
/// Unlike [`ParseError`], these keep the connection usable: the request itself was well formed.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("resource not found: {path}")]
    NotFound { path: String },

    #[error("resource not readable: {path}")]
    Forbidden { path: String },

    #[error("resource is a directory: {path}")]
    IsDirectory { path: String },

    #[error("resource {path} is {size} bytes, the limit is {limit}")]
    TooLarge { path: String, size: u64, limit: u64 },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ResourceError {
    pub fn not_found<S: ToString>(path: S) -> Self {
        Self::NotFound { path: path.to_string() }
    }

    pub fn forbidden<S: ToString>(path: S) -> Self {
        Self::Forbidden { path: path.to_string() }
    }

    pub fn is_directory<S: ToString>(path: S) -> Self {
        Self::IsDirectory { path: path.to_string() }
    }

    pub fn too_large<S: ToString>(path: S, size: u64, limit: u64) -> Self {
        Self::TooLarge { path: path.to_string(), size, limit }
    }

    /// Status code of the response that reports this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::IsDirectory { .. } => StatusCode::BAD_REQUEST,
            Self::TooLarge { .. } | Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors that end a session immediately, without any response.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("peer closed the connection")]
    PeerClosed,

    #[error("read buffer exhausted at {capacity} bytes")]
    Capacity { capacity: usize },

    #[error("transport error: {source}")]
    Transport {
        #[from]
        source: io::Error,
    },
}

impl SessionError {
    pub fn capacity(capacity: usize) -> Self {
        Self::Capacity { capacity }
    }

    pub fn transport<E: Into<io::Error>>(e: E) -> Self {
        Self::Transport { source: e.into() }
    }
}
