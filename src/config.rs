//! Server configuration.
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. built-in defaults ([`Config::default`]);
//! 2. an optional JSON file passed with `--config`;
//! 3. command-line flags, each of which can also come from an `RTINY_*`
//!    environment variable.
//!
//! ```bash
//! rtiny --listen 0.0.0.0:8000 --static-root ./www
//! RTINY_CGI_ROOT=/srv/cgi-bin rtiny --config rtiny.json
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Effective server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the listener binds to.
    pub listen: String,
    /// Directory static URIs are resolved under.
    pub static_root: PathBuf,
    /// Directory CGI programs are resolved under.
    pub cgi_root: PathBuf,
    /// URI prefix that routes a request to a CGI program.
    pub cgi_prefix: String,
    /// File served for URIs that end in `/`.
    pub index: String,
    /// Line buffer size for the request line and each header line.
    pub max_line: usize,
    /// Upper bound on reading the request line and headers; unbounded when absent.
    pub header_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8000".to_owned(),
            static_root: PathBuf::from("./static"),
            cgi_root: PathBuf::from("./cgi-bin"),
            cgi_prefix: "/cgi-bin".to_owned(),
            index: "index.html".to_owned(),
            max_line: 8192,
            header_timeout_secs: None,
        }
    }
}

impl Config {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: origin.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&json, path)
    }

    /// Builds the effective configuration from parsed command-line arguments.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        args.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Returns the header read deadline as a [`Duration`].
    pub fn header_timeout(&self) -> Option<Duration> {
        self.header_timeout_secs.map(Duration::from_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_line < 2 {
            return Err(ConfigError::Invalid {
                field: "max_line",
                reason: "must be at least 2",
            });
        }
        if !self.cgi_prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "cgi_prefix",
                reason: "must start with '/'",
            });
        }
        if self.index.is_empty() || self.index.contains('/') {
            return Err(ConfigError::Invalid {
                field: "index",
                reason: "must be a plain file name",
            });
        }
        Ok(())
    }
}

/// Command-line arguments of the `rtiny` binary.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "rtiny")]
#[command(about = "A tiny HTTP/1.0 server for static files and CGI programs")]
#[command(version)]
pub struct Args {
    /// JSON config file; flags below override its values
    #[arg(short, long, env = "RTINY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "RTINY_LISTEN")]
    pub listen: Option<String>,

    /// Directory served for static URIs
    #[arg(long, env = "RTINY_STATIC_ROOT")]
    pub static_root: Option<PathBuf>,

    /// Directory holding CGI programs
    #[arg(long, env = "RTINY_CGI_ROOT")]
    pub cgi_root: Option<PathBuf>,

    /// URI prefix routed to CGI programs
    #[arg(long, env = "RTINY_CGI_PREFIX")]
    pub cgi_prefix: Option<String>,

    /// Index file for directory URIs
    #[arg(long, env = "RTINY_INDEX")]
    pub index: Option<String>,

    /// Maximum request/header line size in bytes
    #[arg(long, env = "RTINY_MAX_LINE")]
    pub max_line: Option<usize>,

    /// Seconds allowed for the request line and headers to arrive
    #[arg(long, env = "RTINY_HEADER_TIMEOUT")]
    pub header_timeout_secs: Option<u64>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(listen) = &self.listen {
            config.listen.clone_from(listen);
        }
        if let Some(root) = &self.static_root {
            config.static_root.clone_from(root);
        }
        if let Some(root) = &self.cgi_root {
            config.cgi_root.clone_from(root);
        }
        if let Some(prefix) = &self.cgi_prefix {
            config.cgi_prefix.clone_from(prefix);
        }
        if let Some(index) = &self.index {
            config.index.clone_from(index);
        }
        if let Some(max_line) = self.max_line {
            config.max_line = max_line;
        }
        if let Some(secs) = self.header_timeout_secs {
            config.header_timeout_secs = Some(secs);
        }
    }
}
