//! HTTP/1.0 protocol types and parsing.
//!
//! This module provides the core HTTP primitives:
//! [`Method`], [`StatusCode`], [`Headers`], [`Request`], and [`Response`],
//! plus [`error_page`] for the HTML bodies sent with error statuses.

use std::fmt;

pub mod error_page;
pub mod headers;
pub mod request;
pub mod response;

pub use error_page::error_page;
pub use headers::Headers;
pub use request::{Request, RequestError, RequestLine};
pub use response::Response;

/// Protocol version written on every status line.
pub const HTTP_VERSION: &str = "HTTP/1.0";

/// Value of the `Server` header and of `SERVER_SOFTWARE` for CGI programs.
pub const SERVER_NAME: &str = concat!("rtiny/", env!("CARGO_PKG_VERSION"));

/// An HTTP response status code.
///
/// Only the statuses the server actually produces are represented.
///
/// # Examples
///
/// ```
/// use rtiny::http::StatusCode;
///
/// let status = StatusCode::NotFound;
/// assert_eq!(status.as_u16(), 404);
/// assert_eq!(status.canonical_reason(), "Not Found");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StatusCode {
    Ok = 200,

    BadRequest = 400,
    Forbidden = 403,
    NotFound = 404,

    InternalServerError = 500,
    NotImplemented = 501,
}

impl StatusCode {
    /// Returns the numeric status code as a `u16`.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the canonical reason phrase for this status code.
    pub fn canonical_reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::BadRequest => "Bad Request",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::InternalServerError => "Internal Server Error",
            Self::NotImplemented => "Not Implemented",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.canonical_reason())
    }
}

/// An HTTP request method.
///
/// Method names are matched case-insensitively. Anything outside the standard set
/// is kept verbatim in [`Method::Custom`] so it can be echoed back in a 501 page.
///
/// # Examples
///
/// ```
/// use rtiny::http::Method;
///
/// let method: Method = "get".parse().unwrap();
/// assert_eq!(method, Method::Get);
/// assert!(method.is_supported());
///
/// let method: Method = "DELETE".parse().unwrap();
/// assert!(!method.is_supported());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Connect,
    Trace,
    /// A non-standard extension method.
    Custom(String),
}

impl Method {
    /// Returns the method as a string slice.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Connect => "CONNECT",
            Self::Trace => "TRACE",
            Self::Custom(s) => s.as_str(),
        }
    }

    /// Returns `true` for the methods this server implements: GET and POST.
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Get | Self::Post)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const KNOWN: [Method; 9] = [
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Head,
            Method::Options,
            Method::Patch,
            Method::Connect,
            Method::Trace,
        ];
        Ok(KNOWN
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .unwrap_or_else(|| Self::Custom(s.to_owned())))
    }
}
