//! `rtiny-echo`: echo every received line back to the client, one client at a time.

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rtiny::server::echo::echo_lines;

#[derive(Debug, Parser)]
#[command(name = "rtiny-echo", about = "Line echo server", version)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8000", env = "RTINY_ECHO_LISTEN")]
    listen: String,

    /// Maximum line size in bytes
    #[arg(long, default_value_t = 1024)]
    max_line: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let listener = TcpListener::bind(&args.listen).await?;
    info!(address = %listener.local_addr()?, "echo server listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };
        info!(%peer, "client connected");
        match echo_lines(stream, args.max_line).await {
            Ok(lines) => info!(%peer, lines, "client disconnected"),
            Err(e) => warn!(%peer, error = %e, "echo connection failed"),
        }
    }
}
