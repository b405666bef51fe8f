//! `rtiny`: serve static files and CGI programs over HTTP/1.0.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rtiny::config::{Args, Config};
use rtiny::server::Server;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = Config::load(&Args::parse())?;
    tracing::info!(
        static_root = %config.static_root.display(),
        cgi_root = %config.cgi_root.display(),
        cgi_prefix = %config.cgi_prefix,
        "configuration loaded"
    );

    let server = Server::bind(&config).await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
