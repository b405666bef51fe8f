//! Content handlers: static file transfer and CGI execution.
//!
//! Both handlers start from a [`stat`] of the resolved path and report failures as
//! [`ServeError`], which knows the status and error page each failure maps to.

use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::http::{RequestError, Response, StatusCode, error_page};

pub mod cgi;
pub mod mime;
pub mod static_file;

pub use cgi::{CgiOutcome, serve_dynamic};
pub use static_file::serve_static;

/// Why a request could not be served.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("{cause}: {reason}")]
    BadRequest { cause: String, reason: &'static str },

    #[error("{} not found", path.display())]
    NotFound { path: PathBuf },

    #[error("access to {} denied: {reason}", path.display())]
    Forbidden { path: PathBuf, reason: &'static str },

    #[error("method {method} is not implemented")]
    NotImplemented { method: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },

    #[error("failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The connection itself failed (or the client left); nothing more can be sent.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed before a request was received")]
    Closed,
}

impl ServeError {
    /// The status sent to the client, or `None` when no response can be written.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::BadRequest { .. } => Some(StatusCode::BadRequest),
            Self::NotFound { .. } => Some(StatusCode::NotFound),
            Self::Forbidden { .. } => Some(StatusCode::Forbidden),
            Self::NotImplemented { .. } => Some(StatusCode::NotImplemented),
            Self::Internal { .. } | Self::Spawn { .. } => Some(StatusCode::InternalServerError),
            Self::Io(_) | Self::Closed => None,
        }
    }

    /// The error response for this failure, or `None` when no response can be written.
    pub fn error_page(&self) -> Option<Response> {
        let status = self.status()?;
        let page = match self {
            Self::BadRequest { cause, reason } => error_page(status, cause, reason),
            Self::NotFound { path } => {
                error_page(status, &path.display().to_string(), "rtiny couldn't find this file")
            }
            Self::Forbidden { path, reason } => error_page(status, &path.display().to_string(), reason),
            Self::NotImplemented { method } => {
                error_page(status, method, "rtiny does not implement this method")
            }
            Self::Internal { reason } => error_page(status, reason, "rtiny failed to handle the request"),
            Self::Spawn { program, .. } => error_page(
                status,
                &program.display().to_string(),
                "rtiny couldn't start the CGI program",
            ),
            Self::Io(_) | Self::Closed => return None,
        };
        Some(page)
    }
}

impl From<RequestError> for ServeError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Closed => Self::Closed,
            RequestError::BadRequestLine { line } => Self::BadRequest {
                cause: line,
                reason: "rtiny couldn't parse the request line",
            },
            RequestError::InvalidContentLength { value } => Self::BadRequest {
                cause: value,
                reason: "rtiny couldn't parse the Content-Length header",
            },
            RequestError::Io(e) => Self::Io(e),
        }
    }
}

/// Looks up the metadata of a resolved path.
///
/// # Errors
///
/// - [`ServeError::NotFound`] if nothing exists at `path`.
/// - [`ServeError::Forbidden`] if a directory on the way cannot be searched.
/// - [`ServeError::Internal`] for any other failure.
pub async fn stat(path: &Path) -> Result<Metadata, ServeError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ServeError::NotFound {
            path: path.to_owned(),
        }),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(ServeError::Forbidden {
            path: path.to_owned(),
            reason: "rtiny couldn't access the file",
        }),
        Err(e) => Err(ServeError::Internal {
            reason: format!("stat {} failed: {e}", path.display()),
        }),
    }
}
