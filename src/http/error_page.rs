//! Self-contained HTML bodies for error responses.

use super::{Response, SERVER_NAME, StatusCode};

/// Builds an error response: a small HTML page naming the status, a long
/// description and the offending `cause` (a file name, a method, ...).
///
/// The response carries `Content-Type: text/html` and a `Content-Length` equal to
/// the body size.
///
/// # Examples
///
/// ```
/// use rtiny::http::{StatusCode, error_page};
///
/// let response = error_page(StatusCode::NotFound, "./static/missing.html", "rtiny couldn't find this file");
/// assert_eq!(response.status(), StatusCode::NotFound);
/// assert!(String::from_utf8_lossy(response.body_ref()).contains("./static/missing.html"));
/// ```
pub fn error_page(status: StatusCode, cause: &str, long_msg: &str) -> Response {
    let body = format!(
        "<html><title>rtiny Error</title><body bgcolor=\"ffffff\">\r\n\
         {code}: {reason}\r\n\
         <p>{long}: {cause}\r\n\
         <hr><em>{SERVER_NAME}</em>\r\n\
         </body></html>\r\n",
        code = status.as_u16(),
        reason = status.canonical_reason(),
        long = escape_html(long_msg),
        cause = escape_html(cause),
    );

    Response::new(status)
        .header("Server", SERVER_NAME)
        .header("Connection", "close")
        .header("Content-Type", "text/html")
        .body(body)
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_length_matches_body() {
        let response = error_page(StatusCode::Forbidden, "secret.txt", "rtiny couldn't read the file");
        let body_len = response.body_ref().len();
        let text = String::from_utf8(response.into_bytes().to_vec()).unwrap();

        assert!(text.starts_with("HTTP/1.0 403 Forbidden\r\n"));
        assert!(text.contains("Content-Type: text/html\r\n"));
        assert!(text.contains(&format!("Content-Length: {body_len}\r\n")));

        let (_, body) = text.split_once("\r\n\r\n").unwrap();
        assert_eq!(body.len(), body_len);
        assert!(body.contains("403: Forbidden"));
        assert!(body.contains("rtiny couldn't read the file: secret.txt"));
    }

    #[test]
    fn cause_is_escaped() {
        let response = error_page(StatusCode::NotImplemented, "<script>", "unsupported");
        let body = String::from_utf8_lossy(response.body_ref()).into_owned();
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>"));
    }
}
