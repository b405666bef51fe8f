//! File extension to MIME type table.

use std::path::Path;

const TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("jpg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
];

/// Type used when the extension is missing or not in the table.
pub const DEFAULT_TYPE: &str = "text/plain";

/// Returns the `Content-Type` for `path`, judged by its extension alone.
///
/// ```
/// use std::path::Path;
/// use rtiny::handler::mime::content_type;
///
/// assert_eq!(content_type(Path::new("static/index.html")), "text/html");
/// assert_eq!(content_type(Path::new("notes.md")), "text/plain");
/// ```
pub fn content_type(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return DEFAULT_TYPE;
    };
    TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map_or(DEFAULT_TYPE, |&(_, mime)| mime)
}
