//! TCP server: iterative accept loop and the per-connection request state machine.
//!
//! Connections are served one at a time: the accept loop awaits each connection,
//! including any CGI program it started, before accepting the next. Each
//! connection carries exactly one request.
//!
//! ```text
//!  START ─▶ LINE_READ ─▶ METHOD_CHECK ─▶ HEADERS_READ ─▶ URI_CLASSIFY ─▶ STAT_CHECK
//!              │              │               │               │              │
//!              └──────────────┴───── fail ────┴───────────────┴──────────────┤
//!                                                                            ▼
//!                                        STATIC_SERVE | DYNAMIC_SERVE   error page
//!                                                   └──────────┬──────────┘
//!                                                              ▼
//!                                                            CLOSE
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::Config;
use crate::handler::cgi::CgiScript;
use crate::handler::{self, ServeError, serve_dynamic, serve_static};
use crate::http::{Request, RequestLine, StatusCode, request::read_content_length};
use crate::rio::{Rio, write_n};
use crate::router::{Route, Router};

pub mod echo;

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Everything a connection needs to resolve and serve its request.
#[derive(Debug, Clone)]
pub struct Site {
    pub router: Router,
    pub max_line: usize,
    pub header_timeout: Option<Duration>,
}

impl Site {
    pub fn from_config(config: &Config) -> Self {
        Self {
            router: Router::from_config(config),
            max_line: config.max_line,
            header_timeout: config.header_timeout(),
        }
    }
}

/// The rtiny HTTP/1.0 server.
///
/// # Examples
///
/// ```rust,no_run
/// use rtiny::config::Config;
/// use rtiny::server::Server;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = Server::bind(&Config::default()).await?;
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    site: Site,
}

impl Server {
    /// Binds the listener to `config.listen`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(config: &Config) -> Result<Self, ServerError> {
        let addr = config.listen.as_str();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            site: Site::from_config(config),
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves connections until the process is terminated.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves connections until `shutdown` resolves.
    ///
    /// Shutdown is observed between connections; a connection in progress is
    /// always finished first.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(address = %self.local_addr, "rtiny listening");

        loop {
            let (stream, peer_addr) = tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                        continue;
                    }
                },
            };

            debug!(peer = %peer_addr, "connection accepted");
            let span = info_span!("connection", peer = %peer_addr);
            if let Err(e) = handle_connection(stream, &self.site).instrument(span).await {
                warn!(peer = %peer_addr, error = %e, "connection closed with error");
            }
        }
    }
}

/// Serves the single request carried by `stream`, then closes it.
///
/// Failures that still allow a response are answered with an error page. Hard
/// I/O failures abort the request without a response; they are returned only if
/// closing the stream fails as well, so one bad connection never stops the
/// accept loop.
pub async fn handle_connection<S>(stream: S, site: &Site) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut rio = Rio::new(reader);

    match serve_request(&mut rio, &mut writer, site).await {
        Ok(status) => debug!(status = status.as_u16(), "connection finished"),
        Err(ServeError::Closed) => debug!("client closed the connection without a request"),
        Err(err) => match err.error_page() {
            Some(page) => {
                info!(status = page.status().as_u16(), error = %err, "request failed");
                write_n(&mut writer, &page.into_bytes()).await?;
            }
            None => warn!(error = %err, "request aborted"),
        },
    }

    writer.shutdown().await
}

async fn serve_request<R, W>(
    rio: &mut Rio<R>,
    out: &mut W,
    site: &Site,
) -> Result<StatusCode, ServeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let request = match site.header_timeout {
        Some(limit) => tokio::time::timeout(limit, read_request(rio, site.max_line))
            .await
            .map_err(|_| {
                ServeError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "request head not received in time",
                ))
            })??,
        None => read_request(rio, site.max_line).await?,
    };

    let route = site.router.classify(request.uri())?;
    let meta = handler::stat(route.path()).await?;

    match &route {
        Route::Static { path } => {
            serve_static(out, path, &meta).await?;
        }
        Route::Dynamic {
            path,
            script_name,
            query,
        } => {
            let script = CgiScript {
                program: path.as_path(),
                script_name: script_name.as_str(),
                query: query.as_str(),
            };
            serve_dynamic(rio, out, &request, &script, &meta).await?;
        }
    }

    info!(
        method = %request.method(),
        uri = request.uri(),
        status = StatusCode::Ok.as_u16(),
        "request served"
    );
    Ok(StatusCode::Ok)
}

// LINE_READ, METHOD_CHECK, HEADERS_READ. An unsupported method is refused before
// any header is read.
async fn read_request<R>(rio: &mut Rio<R>, max_line: usize) -> Result<Request, ServeError>
where
    R: AsyncRead + Unpin,
{
    let line = RequestLine::read(rio, max_line).await?;
    if !line.method.is_supported() {
        return Err(ServeError::NotImplemented {
            method: line.method.to_string(),
        });
    }
    debug!(method = %line.method, uri = %line.uri, version = %line.version, "request line read");

    let content_length = read_content_length(rio, max_line).await?;
    Ok(Request::new(line, content_length))
}
