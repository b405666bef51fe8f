//! # rtiny
//!
//! A tiny HTTP/1.0 server: static files from one directory, CGI programs from
//! another, one request per connection, built on short-read tolerant buffered I/O.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rtiny::{Config, Server};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         listen: "127.0.0.1:8000".to_owned(),
//!         ..Config::default()
//!     };
//!     Server::bind(&config).await?.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod handler;
pub mod http;
pub mod rio;
pub mod router;
pub mod server;

#[cfg(test)]
mod testutil;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use config::{Config, ConfigError};
pub use handler::ServeError;
pub use http::{Method, Request, Response, StatusCode};
pub use rio::Rio;
pub use server::{Server, ServerError};
