//! HTTP/1.0 response builder.
//!
//! Provides a fluent builder API for constructing responses and serializing them
//! to a byte buffer. The body can either be carried in the response itself or be
//! streamed separately after the head (static files, CGI output).

use bytes::{BufMut, BytesMut};

use super::{HTTP_VERSION, Headers, StatusCode};

/// An HTTP/1.0 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use rtiny::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("Content-Type", "text/html")
///     .body("<p>hi</p>");
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 9\r\n"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
    declared_length: Option<u64>,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
            declared_length: None,
        }
    }

    /// Appends a response header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the response body from a string.
    ///
    /// The `Content-Length` header is written automatically by [`into_bytes`](Self::into_bytes).
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into().into_bytes();
        self
    }

    /// Declares the length of a body that the caller streams after the head.
    ///
    /// The declared value replaces the in-memory body length in `Content-Length`,
    /// and the in-memory body (if any) is not serialized.
    #[must_use]
    pub fn declared_length(mut self, length: u64) -> Self {
        self.declared_length = Some(length);
        self
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body_ref(&self) -> &[u8] {
        &self.body
    }

    fn put_status_and_headers(&self, buf: &mut BytesMut) {
        buf.put(
            format!(
                "{HTTP_VERSION} {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );
        buf.put(self.headers.to_string().as_bytes());
    }

    /// Serializes the response using HTTP/1.0 wire format.
    ///
    /// Automatically adds:
    /// - `Content-Type: text/plain` if the body is non-empty and no
    ///   `Content-Type` header was set.
    /// - `Content-Length: <n>` (always written, last before the blank line).
    pub fn into_bytes(mut self) -> BytesMut {
        let streamed = self.declared_length.is_some();
        let content_length = self.declared_length.unwrap_or(self.body.len() as u64);

        if !streamed && !self.body.is_empty() && !self.headers.contains("content-type") {
            self.headers.insert("Content-Type", "text/plain");
        }

        let body_len = if streamed { 0 } else { self.body.len() };
        let mut buf = BytesMut::with_capacity(128 + self.headers.len() * 64 + body_len);

        self.put_status_and_headers(&mut buf);
        buf.put(format!("Content-Length: {content_length}\r\n").as_bytes());
        buf.put(&b"\r\n"[..]);

        if !streamed {
            buf.put(self.body.as_slice());
        }

        buf
    }

    /// Serializes only the status line and headers, leaving the header block open.
    ///
    /// Used in front of CGI output: the program appends its own header fields and
    /// the terminating blank line, so neither `Content-Length` nor the separator is
    /// written here.
    pub fn into_open_head(self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(64 + self.headers.len() * 64);
        self.put_status_and_headers(&mut buf);
        buf
    }
}
