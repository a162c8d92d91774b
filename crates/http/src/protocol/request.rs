//! HTTP request header produced by the request decoder.
//!
//! Only the fields the server acts upon are kept: method, url, version, host,
//! content length and the keep-alive flag. Everything else in the header section
//! is skipped during decoding.

use std::ops::Range;

use http::{Method, Version};

/// Represents a fully decoded HTTP request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    method: Method,
    url: String,
    version: Version,
    host: Option<String>,
    content_length: u64,
    keep_alive: bool,
    body: Range<usize>,
}

impl RequestHeader {
    pub(crate) fn new(method: Method, url: String, version: Version) -> Self {
        Self { method, url, version, host: None, content_length: 0, keep_alive: false, body: 0..0 }
    }

    pub(crate) fn set_host(&mut self, host: String) {
        self.host = Some(host);
    }

    pub(crate) fn set_content_length(&mut self, content_length: u64) {
        self.content_length = content_length;
    }

    pub(crate) fn set_keep_alive(&mut self, keep_alive: bool) {
        self.keep_alive = keep_alive;
    }

    pub(crate) fn set_body(&mut self, body: Range<usize>) {
        self.body = body;
    }

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the absolute path of the request, with any `http://authority` prefix removed.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the request's HTTP version, always HTTP/1.1 for accepted requests.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the value of the `Host` header, if one was sent.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Returns true if the client sent `Connection: keep-alive`.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Byte range of the opaque request body inside the session read buffer.
    pub fn body_range(&self) -> Range<usize> {
        self.body.clone()
    }

    /// Returns true for `HEAD` requests, whose responses carry no body.
    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }
}
