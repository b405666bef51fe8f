//! URI classification: decide whether a request is served from disk or by a CGI
//! program, and map the URI to a filesystem path.
//!
//! | URI                        | Route                                             |
//! |----------------------------|---------------------------------------------------|
//! | `/`                        | static `<static_root>/index.html`                 |
//! | `/css/site.css?v=2`        | static `<static_root>/css/site.css`               |
//! | `/cgi-bin/adder?x=3&y=5`   | dynamic `<cgi_root>/adder`, query `x=3&y=5`       |
//!
//! A URI is dynamic when its path is the CGI prefix itself or starts with the
//! prefix followed by `/`. Any `..` path segment is refused before a path is built.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::handler::ServeError;

/// Where a request is dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// A file under the static root.
    Static { path: PathBuf },
    /// A CGI program under the CGI root.
    Dynamic {
        path: PathBuf,
        /// URI path of the program, passed on as `SCRIPT_NAME`.
        script_name: String,
        /// Everything after the first `?`; empty when absent.
        query: String,
    },
}

impl Route {
    /// The filesystem path the route resolves to.
    pub fn path(&self) -> &Path {
        match self {
            Self::Static { path } | Self::Dynamic { path, .. } => path,
        }
    }
}

/// Maps request URIs to [`Route`]s.
#[derive(Debug, Clone)]
pub struct Router {
    static_root: PathBuf,
    cgi_root: PathBuf,
    cgi_prefix: String,
    index: String,
}

impl Router {
    pub fn new(
        static_root: impl Into<PathBuf>,
        cgi_root: impl Into<PathBuf>,
        cgi_prefix: impl Into<String>,
        index: impl Into<String>,
    ) -> Self {
        let mut cgi_prefix = cgi_prefix.into();
        while cgi_prefix.len() > 1 && cgi_prefix.ends_with('/') {
            cgi_prefix.pop();
        }
        Self {
            static_root: static_root.into(),
            cgi_root: cgi_root.into(),
            cgi_prefix,
            index: index.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.static_root,
            &config.cgi_root,
            config.cgi_prefix.as_str(),
            config.index.as_str(),
        )
    }

    /// Classifies `uri` and resolves it to a filesystem path.
    ///
    /// # Errors
    ///
    /// [`ServeError::Forbidden`] if the URI path contains a `..` segment.
    pub fn classify(&self, uri: &str) -> Result<Route, ServeError> {
        let (path, query) = uri.split_once('?').unwrap_or((uri, ""));

        if path.split('/').any(|segment| segment == "..") {
            return Err(ServeError::Forbidden {
                path: PathBuf::from(path),
                reason: "rtiny doesn't serve paths outside its roots",
            });
        }

        if let Some(rest) = self.strip_cgi_prefix(path) {
            return Ok(Route::Dynamic {
                path: self.cgi_root.join(rest.trim_start_matches('/')),
                script_name: path.to_owned(),
                query: query.to_owned(),
            });
        }

        let mut file = self.static_root.join(path.trim_start_matches('/'));
        if path.ends_with('/') || path.is_empty() {
            file.push(&self.index);
        }
        Ok(Route::Static { path: file })
    }

    fn strip_cgi_prefix<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.cgi_prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') || self.cgi_prefix == "/" {
            Some(rest)
        } else {
            None
        }
    }
}
