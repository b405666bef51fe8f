//! `adder`: a CGI program that adds two integers.
//!
//! The operands come from `x=<int>&y=<int>`, taken from `QUERY_STRING` for GET and
//! from exactly `CONTENT_LENGTH` bytes of standard input for POST. Missing or
//! unparsable operands count as zero.

use std::env;
use std::io::{self, Read, Write};

fn main() -> io::Result<()> {
    let method = env::var("REQUEST_METHOD").unwrap_or_default();
    let args = if method.eq_ignore_ascii_case("POST") {
        let length = env::var("CONTENT_LENGTH")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);
        let mut body = Vec::new();
        io::stdin().lock().take(length).read_to_end(&mut body)?;
        String::from_utf8_lossy(&body).into_owned()
    } else {
        env::var("QUERY_STRING").unwrap_or_default()
    };

    let (x, y) = operands(&args);
    let content = page(x, y);

    let mut out = io::stdout().lock();
    write!(out, "Connection: close\r\n")?;
    write!(out, "Content-Length: {}\r\n", content.len())?;
    write!(out, "Content-Type: text/html\r\n\r\n")?;
    out.write_all(content.as_bytes())?;
    out.flush()
}

/// Extracts the `x` and `y` operands from an `x=..&y=..` argument string.
fn operands(args: &str) -> (i64, i64) {
    let mut x = 0;
    let mut y = 0;
    for pair in args.trim().split('&') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let value = value.trim().parse().unwrap_or(0);
        match name.trim() {
            "x" => x = value,
            "y" => y = value,
            _ => {}
        }
    }
    (x, y)
}

fn page(x: i64, y: i64) -> String {
    format!(
        "<html><body>\n<h1>{x} + {y} = {}</h1>\n</body></html>\n",
        x.wrapping_add(y)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_operands() {
        assert_eq!(operands("x=3&y=5"), (3, 5));
        assert_eq!(operands("y=-2&x=7"), (7, -2));
    }

    #[test]
    fn missing_or_bad_operands_are_zero() {
        assert_eq!(operands(""), (0, 0));
        assert_eq!(operands("x=4"), (4, 0));
        assert_eq!(operands("x=abc&y=1"), (0, 1));
        assert_eq!(operands("garbage&y=9"), (0, 9));
    }

    #[test]
    fn trailing_newline_in_body_is_ignored() {
        assert_eq!(operands("x=10&y=20\n"), (10, 20));
    }

    #[test]
    fn page_shows_the_sum() {
        assert_eq!(
            page(10, 20),
            "<html><body>\n<h1>10 + 20 = 30</h1>\n</body></html>\n"
        );
    }
}
