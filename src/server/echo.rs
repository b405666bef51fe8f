//! Line echo service.
//!
//! Every line a client sends is written back prefixed with `-> ` until the client
//! closes its side. Useful for poking at [`Rio`] behaviour with `nc` or `telnet`.

use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::rio::{Rio, write_n};

const PREFIX: &[u8] = b"-> ";

/// Echoes `stream` line by line and returns the number of lines echoed.
///
/// Lines longer than `max_line - 1` bytes are echoed in fragments, each with its
/// own prefix.
pub async fn echo_lines<S>(stream: S, max_line: usize) -> io::Result<u64>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut rio = Rio::new(reader);
    let mut line = Vec::with_capacity(max_line);
    let mut reply = Vec::with_capacity(max_line + PREFIX.len());
    let mut lines = 0;

    while rio.read_line(&mut line, max_line).await? > 0 {
        reply.clear();
        reply.extend_from_slice(PREFIX);
        reply.extend_from_slice(&line);
        write_n(&mut writer, &reply).await?;
        lines += 1;
    }

    debug!(lines, "echo client disconnected");
    writer.shutdown().await?;
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn echoes_each_line_with_prefix() {
        let (mut client, server) = tokio::io::duplex(4096);
        client.write_all(b"hello\r\nworld\nlast").await.unwrap();
        client.shutdown().await.unwrap();

        let lines = echo_lines(server, 1024).await.unwrap();
        assert_eq!(lines, 3);

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "-> hello\r\n-> world\n-> last");
    }

    #[tokio::test]
    async fn long_lines_are_echoed_in_fragments() {
        let (mut client, server) = tokio::io::duplex(4096);
        client.write_all(b"abcdefg\n").await.unwrap();
        client.shutdown().await.unwrap();

        echo_lines(server, 4).await.unwrap();

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "-> abc-> def-> g\n");
    }
}
