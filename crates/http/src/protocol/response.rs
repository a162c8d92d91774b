use bytes::Bytes;
use http::StatusCode;

const ERROR_400_FORM: &str = "Your request has bad syntax or is inherently impossible to satisfy.\n";
const ERROR_403_FORM: &str = "You do not have permission to get file from this server.\n";
const ERROR_404_FORM: &str = "The requested file was not found on this server.\n";
const ERROR_500_FORM: &str = "There was an unusual problem serving the requested file.\n";

/// Body sent in place of an empty file.
pub const EMPTY_FILE_PAGE: &str = "<html><body></body></html>";

/// Status line and framing headers of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead {
    status: StatusCode,
    content_length: u64,
    keep_alive: bool,
}

impl ResponseHead {
    pub fn new(status: StatusCode, content_length: u64, keep_alive: bool) -> Self {
        Self { status, content_length, keep_alive }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }
}

/// A response ready to be encoded: head plus the body segment of the scatter write.
#[derive(Debug, Clone)]
pub struct Response {
    head: ResponseHead,
    body: Bytes,
}

impl Response {
    /// Builds a `200 OK` for the given content; empty content is replaced by a placeholder page.
    pub fn ok(content: Bytes, keep_alive: bool) -> Self {
        let body = if content.is_empty() { Bytes::from_static(EMPTY_FILE_PAGE.as_bytes()) } else { content };
        Self { head: ResponseHead::new(StatusCode::OK, body.len() as u64, keep_alive), body }
    }

    /// Builds an error response with the canned explanation for `status`.
    pub fn error(status: StatusCode, keep_alive: bool) -> Self {
        let form = match status {
            StatusCode::BAD_REQUEST => ERROR_400_FORM,
            StatusCode::FORBIDDEN => ERROR_403_FORM,
            StatusCode::NOT_FOUND => ERROR_404_FORM,
            _ => ERROR_500_FORM,
        };
        let body = Bytes::from_static(form.as_bytes());
        Self { head: ResponseHead::new(status, body.len() as u64, keep_alive), body }
    }

    /// Drops the body while keeping the announced `Content-Length`, as required for `HEAD`.
    #[must_use]
    pub fn without_body(mut self) -> Self {
        self.body = Bytes::new();
        self
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub fn into_parts(self) -> (ResponseHead, Bytes) {
        (self.head, self.body)
    }
}
