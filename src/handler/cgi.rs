//! CGI execution: run a program per request and stream its output to the client.
//!
//! The program receives the request metadata as environment variables and, for
//! POST, exactly `Content-Length` body bytes on its standard input. Its standard
//! output follows the server's status line on the client connection and must
//! start with its own header block (`Content-Type: ...`, blank line).
//!
//! ```text
//!  client ──body──▶ Rio::forward_exact ──▶ stdin ┐
//!                                                 program
//!  client ◀── status line ── relay ◀── stdout ────┘
//! ```
//!
//! Body forwarding and output relaying run concurrently, so a program that writes
//! before it has drained its input cannot deadlock against a full pipe. The
//! handler always waits for the program to exit before returning.

use std::fs::Metadata;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use super::ServeError;
use crate::http::{HTTP_VERSION, Method, Request, Response, SERVER_NAME, StatusCode};
use crate::rio::{Rio, relay, write_n};

/// Owner execute permission bit.
const OWNER_EXEC: u32 = 0o100;

/// The program a dynamic route resolved to.
#[derive(Debug, Clone, Copy)]
pub struct CgiScript<'a> {
    /// Filesystem path of the executable.
    pub program: &'a Path,
    /// URI path that selected the program.
    pub script_name: &'a str,
    /// Query string from the URI, without the `?`.
    pub query: &'a str,
}

/// What happened during one CGI invocation.
#[derive(Debug, Clone, Copy)]
pub struct CgiOutcome {
    pub pid: Option<u32>,
    pub exit: ExitStatus,
    /// Request body bytes written to the program's standard input, or `None` if
    /// the program closed its input before the whole body was forwarded.
    pub body_bytes: Option<u64>,
    /// Bytes of program output relayed to the client.
    pub output_bytes: u64,
}

/// Builds the environment for one invocation.
///
/// `REQUEST_METHOD` is always set. A POST gets `CONTENT_LENGTH`; any other method
/// gets `QUERY_STRING` (possibly empty).
pub fn cgi_environment(request: &Request, script: &CgiScript<'_>) -> Vec<(&'static str, String)> {
    let mut env = vec![
        ("GATEWAY_INTERFACE", "CGI/1.1".to_owned()),
        ("SERVER_PROTOCOL", HTTP_VERSION.to_owned()),
        ("SERVER_SOFTWARE", SERVER_NAME.to_owned()),
        ("SCRIPT_NAME", script.script_name.to_owned()),
        ("REQUEST_METHOD", request.method().to_string()),
    ];
    if *request.method() == Method::Post {
        env.push(("CONTENT_LENGTH", request.content_length().to_string()));
    } else {
        env.push(("QUERY_STRING", script.query.to_owned()));
    }
    env
}

/// Runs `script` for `request`, with its output going to `out`.
///
/// `meta` must come from a [`stat`](super::stat) of `script.program`. The status
/// line and `Server` header are written once the program has started and before
/// any of its output. For POST, exactly `request.content_length()` bytes are
/// taken from `rio` (buffered bytes first) and forwarded to the program, after
/// which its standard input is closed.
///
/// # Errors
///
/// - [`ServeError::Forbidden`] if the program is not a regular, executable file.
/// - [`ServeError::Spawn`] if the program could not be started; nothing was written.
/// - [`ServeError::Io`] if the exchange failed after the status line was sent.
pub async fn serve_dynamic<R, W>(
    rio: &mut Rio<R>,
    out: &mut W,
    request: &Request,
    script: &CgiScript<'_>,
    meta: &Metadata,
) -> Result<CgiOutcome, ServeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    if !meta.is_file() || meta.permissions().mode() & OWNER_EXEC == 0 {
        return Err(ServeError::Forbidden {
            path: script.program.to_owned(),
            reason: "rtiny couldn't run the CGI program",
        });
    }

    let forwards_body = *request.method() == Method::Post;

    let mut command = Command::new(script.program);
    command
        .env_clear()
        .envs(cgi_environment(request, script))
        .stdin(if forwards_body {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    if let Some(path) = std::env::var_os("PATH") {
        command.env("PATH", path);
    }

    // The child's pipe ends are closed in this process as part of spawn.
    let mut child = command.spawn().map_err(|source| ServeError::Spawn {
        program: script.program.to_owned(),
        source,
    })?;
    let pid = child.id();
    debug!(pid, program = %script.program.display(), "CGI program started");

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let exchanged = exchange(rio, out, stdin, stdout, request.content_length()).await;
    if exchanged.is_err() {
        if let Err(e) = child.start_kill() {
            debug!(pid, error = %e, "could not kill CGI program");
        }
    }

    let exit = child.wait().await;
    let (body_bytes, output_bytes) = exchanged?;
    let exit = exit?;

    if forwards_body && body_bytes.is_some_and(|n| n < request.content_length()) {
        warn!(
            pid,
            declared = request.content_length(),
            forwarded = body_bytes.unwrap_or_default(),
            "request body ended before Content-Length"
        );
    }
    if !exit.success() {
        warn!(pid, %exit, "CGI program exited unsuccessfully");
    }
    debug!(pid, ?body_bytes, output_bytes, "CGI program finished");

    Ok(CgiOutcome {
        pid,
        exit,
        body_bytes,
        output_bytes,
    })
}

// Writes the status line, then feeds stdin and relays stdout concurrently.
async fn exchange<R, W>(
    rio: &mut Rio<R>,
    out: &mut W,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    content_length: u64,
) -> Result<(Option<u64>, u64), ServeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut stdout = stdout.ok_or_else(|| ServeError::Internal {
        reason: "CGI program output was not captured".to_owned(),
    })?;

    let head = Response::new(StatusCode::Ok)
        .header("Server", SERVER_NAME)
        .into_open_head();
    write_n(out, &head).await?;

    let feed = async move {
        let Some(mut stdin) = stdin else {
            return Ok(Some(0));
        };
        match rio.forward_exact(&mut stdin, content_length).await {
            // Dropping `stdin` closes the pipe: the program reads EOF.
            Ok(forwarded) => Ok(Some(forwarded)),
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("CGI program closed its input before the body was forwarded");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    };
    let output = relay(&mut stdout, out);

    let (forwarded, relayed) = tokio::try_join!(feed, output)?;
    Ok((forwarded, relayed))
}
