//! HTTP/1.0 request parsing on top of [`Rio`].
//!
//! A request is read in two steps so the method can be checked before any header
//! is consumed:
//!
//! 1. [`RequestLine::read`]: `METHOD SP URI SP VERSION CRLF`.
//! 2. [`read_content_length`]: header lines up to the blank terminator line.
//!
//! Only `Content-Length` is interpreted; every other header is skipped.

use thiserror::Error;
use tokio::io::AsyncRead;

use super::Method;
use crate::rio::Rio;

/// Errors that can occur while reading a request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("connection closed before a request line was received")]
    Closed,

    #[error("malformed request line: {line:?}")]
    BadRequestLine { line: String },

    #[error("invalid Content-Length value: {value:?}")]
    InvalidContentLength { value: String },

    #[error("I/O error while reading the request: {0}")]
    Io(#[from] std::io::Error),
}

/// The first line of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub uri: String,
    pub version: String,
}

impl RequestLine {
    /// Splits a raw request line on whitespace into method, URI and version.
    ///
    /// Tokens past the third are ignored.
    ///
    /// # Errors
    ///
    /// [`RequestError::BadRequestLine`] if fewer than three tokens are present.
    ///
    /// # Examples
    ///
    /// ```
    /// use rtiny::http::{Method, RequestLine};
    ///
    /// let line = RequestLine::parse("GET /index.html HTTP/1.0\r\n").unwrap();
    /// assert_eq!(line.method, Method::Get);
    /// assert_eq!(line.uri, "/index.html");
    /// assert_eq!(line.version, "HTTP/1.0");
    /// ```
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        let mut tokens = raw.split_whitespace();
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(method), Some(uri), Some(version)) => Ok(Self {
                method: method.parse().unwrap_or_else(|never| match never {}),
                uri: uri.to_owned(),
                version: version.to_owned(),
            }),
            _ => Err(RequestError::BadRequestLine {
                line: raw.trim_end().to_owned(),
            }),
        }
    }

    /// Reads and parses exactly one line from `rio`.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Closed`] if the stream ends before any byte arrives.
    /// - [`RequestError::BadRequestLine`] if the line has fewer than three tokens.
    /// - [`RequestError::Io`] on a hard read failure.
    pub async fn read<R>(rio: &mut Rio<R>, max_line: usize) -> Result<Self, RequestError>
    where
        R: AsyncRead + Unpin,
    {
        let mut line = Vec::with_capacity(128);
        if rio.read_line(&mut line, max_line).await? == 0 {
            return Err(RequestError::Closed);
        }
        let parsed = Self::parse(&String::from_utf8_lossy(&line));

        // Drop the tail of an overlong request line so header reading starts
        // on a line boundary.
        let mut rest = Vec::new();
        let mut cut = is_cut(&line, max_line);
        while cut && rio.read_line(&mut rest, max_line).await? > 0 {
            cut = !rest.ends_with(b"\n");
        }
        parsed
    }
}

/// Reads header lines until the blank terminator line and returns the declared
/// `Content-Length`, or `0` when the header is absent.
///
/// The header name is matched case-insensitively; when it appears more than once
/// the last value wins. EOF before the terminator ends the header block.
///
/// # Errors
///
/// - [`RequestError::InvalidContentLength`] if the value is not a non-negative integer.
/// - [`RequestError::Io`] on a hard read failure.
pub async fn read_content_length<R>(rio: &mut Rio<R>, max_line: usize) -> Result<u64, RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut content_length = 0;
    let mut line = Vec::with_capacity(128);
    let mut inside_overlong = false;

    loop {
        if rio.read_line(&mut line, max_line).await? == 0 {
            break;
        }

        // Every piece of a line cut at `max_line - 1` is skipped, up to and
        // including the piece carrying its `\n`.
        let fragment = inside_overlong || is_cut(&line, max_line);
        inside_overlong = is_cut(&line, max_line);
        if fragment {
            continue;
        }

        if line == b"\r\n" || line == b"\n" {
            break;
        }

        let Some(colon) = line.iter().position(|&b| b == b':') else {
            continue;
        };
        let (name, value) = line.split_at(colon);
        if !name.trim_ascii().eq_ignore_ascii_case(b"content-length") {
            continue;
        }

        let value = String::from_utf8_lossy(&value[1..]).trim().to_owned();
        content_length = value
            .parse()
            .map_err(|_| RequestError::InvalidContentLength { value })?;
    }

    Ok(content_length)
}

// A line that filled the whole buffer without reaching its `\n`.
fn is_cut(line: &[u8], max_line: usize) -> bool {
    !line.ends_with(b"\n") && line.len() + 1 >= max_line
}

/// A parsed request: the request line plus the body length it declared.
///
/// Built once per connection and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    line: RequestLine,
    content_length: u64,
}

impl Request {
    pub fn new(line: RequestLine, content_length: u64) -> Self {
        Self {
            line,
            content_length,
        }
    }

    /// Reads a complete request head (request line and headers) from `rio`.
    pub async fn read<R>(rio: &mut Rio<R>, max_line: usize) -> Result<Self, RequestError>
    where
        R: AsyncRead + Unpin,
    {
        let line = RequestLine::read(rio, max_line).await?;
        let content_length = read_content_length(rio, max_line).await?;
        Ok(Self::new(line, content_length))
    }

    pub fn method(&self) -> &Method {
        &self.line.method
    }

    /// Returns the raw request URI, including any query string.
    pub fn uri(&self) -> &str {
        &self.line.uri
    }

    pub fn version(&self) -> &str {
        &self.line.version
    }

    /// Returns the declared body length; `0` when no `Content-Length` was sent.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }
}
