//! Decoding of the request line and header fields.
//!
//! Lines are handed over by the [`LineScanner`](crate::codec::line::LineScanner)
//! already stripped of their `\r\n` terminator.
//!
//! # Accepted subset
//!
//! - Methods: `GET` and `HEAD`, case-insensitive
//! - Version: `HTTP/1.1` only, case-insensitive
//! - Url: an absolute path, or an absolute `http://` url whose authority is dropped
//! - Understood headers: `Connection`, `Content-Length` and `Host`; all others are skipped

use http::{Method, Version};
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, RequestHeader};

const HTTP_SCHEME: &[u8] = b"http://";
const HTTP_11: &[u8] = b"HTTP/1.1";

const CONNECTION: &[u8] = b"Connection:";
const CONTENT_LENGTH: &[u8] = b"Content-Length:";
const HOST: &[u8] = b"Host:";
const KEEP_ALIVE: &[u8] = b"keep-alive";

/// Outcome of feeding one header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLine {
    /// A field was consumed, more lines follow
    Field,
    /// The blank line closing the header section
    End,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderDecoder;

impl HeaderDecoder {
    /// Decodes `METHOD SP URL SP VERSION`, tolerating runs of spaces and tabs as separators.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if:
    /// - A separator is missing
    /// - The method is neither `GET` nor `HEAD`
    /// - The version is not `HTTP/1.1`
    /// - The url does not resolve to an absolute path
    pub fn decode_request_line(self, line: &[u8]) -> Result<RequestHeader, ParseError> {
        let (method, rest) = split_blank(line).ok_or(ParseError::invalid_request_line("missing request url"))?;
        let method = parse_method(method)?;

        let (url, version) = split_blank(skip_blanks(rest)).ok_or(ParseError::invalid_request_line("missing http version"))?;
        let version = skip_blanks(version);
        ensure!(version.eq_ignore_ascii_case(HTTP_11), ParseError::invalid_version(String::from_utf8_lossy(version)));

        let path = strip_authority(url).ok_or_else(|| ParseError::invalid_uri(String::from_utf8_lossy(url)))?;
        ensure!(path.first() == Some(&b'/'), ParseError::invalid_uri(String::from_utf8_lossy(url)));
        let path = std::str::from_utf8(path).map_err(|e| ParseError::invalid_uri(e.to_string()))?;

        Ok(RequestHeader::new(method, path.to_owned(), Version::HTTP_11))
    }

    /// Decodes one header line into `header`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidContentLength` if the `Content-Length` value is not a
    /// non-negative decimal integer.
    pub fn decode_field(self, header: &mut RequestHeader, line: &[u8]) -> Result<HeaderLine, ParseError> {
        if line.is_empty() {
            return Ok(HeaderLine::End);
        }

        if let Some(value) = strip_name(line, CONNECTION) {
            if value.trim_ascii().eq_ignore_ascii_case(KEEP_ALIVE) {
                header.set_keep_alive(true);
            }
        } else if let Some(value) = strip_name(line, CONTENT_LENGTH) {
            header.set_content_length(parse_content_length(value.trim_ascii())?);
        } else if let Some(value) = strip_name(line, HOST) {
            header.set_host(String::from_utf8_lossy(value.trim_ascii()).into_owned());
        } else {
            trace!(header = %String::from_utf8_lossy(line), "skip unknown header");
        }

        Ok(HeaderLine::Field)
    }
}

fn parse_method(method: &[u8]) -> Result<Method, ParseError> {
    if method.eq_ignore_ascii_case(b"GET") {
        Ok(Method::GET)
    } else if method.eq_ignore_ascii_case(b"HEAD") {
        Ok(Method::HEAD)
    } else {
        Err(ParseError::invalid_method(String::from_utf8_lossy(method)))
    }
}

fn parse_content_length(value: &[u8]) -> Result<u64, ParseError> {
    ensure!(!value.is_empty() && value.iter().all(u8::is_ascii_digit), ParseError::invalid_content_length(String::from_utf8_lossy(value)));
    let value = std::str::from_utf8(value).map_err(|e| ParseError::invalid_content_length(e.to_string()))?;
    value.parse::<u64>().map_err(|e| ParseError::invalid_content_length(format!("value {value} is not u64: {e}")))
}

/// Drops `http://authority` from an absolute url, keeping the path that follows.
fn strip_authority(url: &[u8]) -> Option<&[u8]> {
    match url.get(..HTTP_SCHEME.len()) {
        Some(scheme) if scheme.eq_ignore_ascii_case(HTTP_SCHEME) => {
            let authority = &url[HTTP_SCHEME.len()..];
            authority.iter().position(|b| *b == b'/').map(|slash| &authority[slash..])
        }
        _ => Some(url),
    }
}

fn strip_name<'a>(line: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    match line.get(..name.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(name) => Some(&line[name.len()..]),
        _ => None,
    }
}

#[inline]
fn is_blank(b: &u8) -> bool {
    *b == b' ' || *b == b'\t'
}

fn split_blank(text: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = text.iter().position(is_blank)?;
    Some((&text[..pos], &text[pos + 1..]))
}

fn skip_blanks(text: &[u8]) -> &[u8] {
    let blanks = text.iter().take_while(|b| is_blank(b)).count();
    &text[blanks..]
}
