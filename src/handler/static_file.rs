//! Static file transfer.

use std::fs::Metadata;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite};
use tracing::debug;

use super::{ServeError, mime};
use crate::http::{Response, SERVER_NAME, StatusCode};
use crate::rio::{relay, write_n};

/// Owner read permission bit.
const OWNER_READ: u32 = 0o400;

/// Sends the file at `path` as a complete `200 OK` response.
///
/// `meta` must come from a [`stat`](super::stat) of the same path. The file must be
/// a regular file readable by its owner; its size becomes the `Content-Length`
/// and its bytes follow the head unchanged.
///
/// Returns the number of body bytes sent.
///
/// # Errors
///
/// - [`ServeError::Forbidden`] if `path` is not a regular, readable file.
/// - [`ServeError::Io`] if the transfer fails after the head was written.
pub async fn serve_static<W>(out: &mut W, path: &Path, meta: &Metadata) -> Result<u64, ServeError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    if !meta.is_file() || meta.permissions().mode() & OWNER_READ == 0 {
        return Err(ServeError::Forbidden {
            path: path.to_owned(),
            reason: "rtiny couldn't read the file",
        });
    }

    let file = File::open(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => ServeError::NotFound {
            path: path.to_owned(),
        },
        ErrorKind::PermissionDenied => ServeError::Forbidden {
            path: path.to_owned(),
            reason: "rtiny couldn't read the file",
        },
        _ => ServeError::Internal {
            reason: format!("open {} failed: {e}", path.display()),
        },
    })?;

    let length = meta.len();
    let head = Response::new(StatusCode::Ok)
        .header("Server", SERVER_NAME)
        .header("Connection", "close")
        .header("Content-Type", mime::content_type(path))
        .declared_length(length)
        .into_bytes();
    write_n(out, &head).await?;

    let sent = relay(&mut file.take(length), out).await?;
    if sent < length {
        return Err(ServeError::Io(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            format!("{} shrank while being sent", path.display()),
        )));
    }

    debug!(path = %path.display(), bytes = sent, "static file sent");
    Ok(sent)
}
