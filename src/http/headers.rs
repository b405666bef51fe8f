//! Response header list with case-insensitive name lookup.

use std::fmt;

/// An ordered, case-insensitive list of HTTP header fields.
///
/// Headers are written in insertion order, which keeps serialized responses
/// deterministic.
///
/// # Examples
///
/// ```
/// use rtiny::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Content-Type", "text/html");
/// headers.insert("Connection", "close");
///
/// assert!(headers.contains("content-type"));
/// assert_eq!(headers.to_string(), "Content-Type: text/html\r\nConnection: close\r\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header entry.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns `true` if the list contains at least one entry with the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.inner {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_contains() {
        let mut h = Headers::new();
        h.insert("Content-Type", "text/plain");
        assert!(h.contains("content-type"));
        assert!(h.contains("CONTENT-TYPE"));
        assert!(!h.contains("x-missing"));
    }

    #[test]
    fn preserves_insertion_order() {
        let mut h = Headers::new();
        h.insert("Server", "rtiny");
        h.insert("Connection", "close");
        assert_eq!(h.to_string(), "Server: rtiny\r\nConnection: close\r\n");
        assert_eq!(h.len(), 2);
    }
}
