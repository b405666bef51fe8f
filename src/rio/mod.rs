//! Robust I/O: short-read/short-write tolerant primitives and a buffered line reader.
//!
//! Sockets and pipes are free to return fewer bytes than requested, and a read or
//! write may be interrupted by a signal before it transfers anything. The helpers
//! here hide both behaviours from callers:
//!
//! - [`read_n`]: unbuffered read of exactly `buf.len()` bytes (fewer only at EOF).
//! - [`write_n`]: write every byte of `buf`, or fail.
//! - [`relay`]: copy a reader to a writer until EOF through [`write_n`].
//! - [`Rio`]: an owned lookahead buffer over a reader, used for line-delimited
//!   reads ([`Rio::read_line`]) and exact-length body forwarding
//!   ([`Rio::forward_exact`]).
//!
//! `ErrorKind::Interrupted` is always retried; every other error is returned as-is.

use std::io::{self, ErrorKind};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Capacity of the internal lookahead buffer of a [`Rio`].
pub const RIO_BUF_SIZE: usize = 8192;

/// Reads exactly `buf.len()` bytes from `reader` without any intermediate buffering.
///
/// Returns the number of bytes read, which is smaller than `buf.len()` only if the
/// stream reached end-of-file first.
///
/// # Errors
///
/// Any I/O error other than [`ErrorKind::Interrupted`] aborts the read.
pub async fn read_n<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Writes every byte of `buf` to `writer`, looping over partial writes.
///
/// # Errors
///
/// Returns [`ErrorKind::WriteZero`] if the peer stops accepting bytes before the
/// whole buffer is written, or any other I/O error except [`ErrorKind::Interrupted`].
pub async fn write_n<W>(writer: &mut W, buf: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut written = 0;
    while written < buf.len() {
        match writer.write(&buf[written..]).await {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "stream closed before the whole buffer was written",
                ));
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Copies `reader` into `writer` until `reader` reaches EOF.
///
/// Returns the number of bytes relayed.
pub async fn relay<R, W>(reader: &mut R, writer: &mut W) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut chunk = vec![0u8; RIO_BUF_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        write_n(writer, &chunk[..n]).await?;
        total += n as u64;
    }
}

/// A reader with an owned lookahead buffer.
///
/// The buffer is refilled from the underlying stream only when every buffered byte
/// has been handed out, so a line split across several socket reads costs one
/// refill per read and no byte is ever delivered twice.
///
/// One `Rio` is created per connection and dropped with it.
#[derive(Debug)]
pub struct Rio<R> {
    inner: R,
    buf: Box<[u8]>,
    // Start of the unread bytes in `buf`.
    pos: usize,
    // Number of unread bytes starting at `pos`; `pos + len <= buf.len()`.
    len: usize,
}

impl<R> Rio<R> {
    /// Wraps `inner` with a buffer of [`RIO_BUF_SIZE`] bytes.
    pub fn new(inner: R) -> Self {
        Self::with_capacity(RIO_BUF_SIZE, inner)
    }

    /// Wraps `inner` with a buffer of `capacity` bytes (at least one).
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        Self {
            inner,
            buf: vec![0u8; capacity.max(1)].into_boxed_slice(),
            pos: 0,
            len: 0,
        }
    }

    /// The bytes pulled from the stream but not yet handed out.
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.pos..self.pos + self.len]
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutable access to the underlying stream.
    ///
    /// Reading from it directly skips any bytes still sitting in [`buffered`](Self::buffered).
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len);
        self.pos += n;
        self.len -= n;
    }
}

impl<R> Rio<R>
where
    R: AsyncRead + Unpin,
{
    // Refills the empty buffer with a single successful read. Returns 0 at EOF.
    async fn fill(&mut self) -> io::Result<usize> {
        debug_assert_eq!(self.len, 0);
        loop {
            match self.inner.read(&mut self.buf).await {
                Ok(n) => {
                    self.pos = 0;
                    self.len = n;
                    return Ok(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Reads up to `out.len()` bytes through the lookahead buffer.
    ///
    /// Returns fewer bytes than requested only at EOF.
    pub async fn read_buffered(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < out.len() {
            if self.len == 0 && self.fill().await? == 0 {
                break;
            }
            let n = self.len.min(out.len() - filled);
            out[filled..filled + n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.consume(n);
            filled += n;
        }
        Ok(filled)
    }

    /// Reads the next line into `line`, replacing its previous contents.
    ///
    /// At most `max_len - 1` bytes are returned, mirroring a C-style buffer that keeps
    /// one slot for the terminator. The result is:
    ///
    /// - a full line including its `\n` when one is found within the limit;
    /// - a truncated fragment without `\n` when the limit is reached first (the rest
    ///   of the line is returned by the following calls);
    /// - the bytes read so far, without `\n`, when EOF interrupts a line;
    /// - `0` only at EOF with nothing read.
    ///
    /// A `max_len` below 2 leaves room for nothing: `line` is cleared, `0` is
    /// returned and the stream is not touched.
    pub async fn read_line(&mut self, line: &mut Vec<u8>, max_len: usize) -> io::Result<usize> {
        line.clear();
        if max_len < 2 {
            return Ok(0);
        }
        let limit = max_len - 1;

        while line.len() < limit {
            if self.len == 0 && self.fill().await? == 0 {
                break;
            }
            let window = self.len.min(limit - line.len());
            let start = self.pos;
            let newline = self.buf[start..start + window]
                .iter()
                .position(|&b| b == b'\n');
            let take = newline.map_or(window, |i| i + 1);
            line.extend_from_slice(&self.buf[start..start + take]);
            self.consume(take);
            if newline.is_some() {
                break;
            }
        }
        Ok(line.len())
    }

    /// Forwards exactly `n` bytes of the stream into `dst`.
    ///
    /// Bytes already sitting in the lookahead buffer go first; the remainder is
    /// pulled straight from the underlying stream with [`read_n`], never asking for
    /// more than is still owed. Anything the peer sends past `n` stays unread.
    ///
    /// Returns the number of bytes forwarded, which is smaller than `n` only if the
    /// stream hit EOF early.
    pub async fn forward_exact<W>(&mut self, dst: &mut W, n: u64) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut remaining = n;

        let take = usize::try_from(remaining).map_or(self.len, |r| r.min(self.len));
        if take > 0 {
            write_n(dst, &self.buf[self.pos..self.pos + take]).await?;
            self.consume(take);
            remaining -= take as u64;
        }

        let chunk_len = usize::try_from(remaining).map_or(RIO_BUF_SIZE, |r| r.min(RIO_BUF_SIZE));
        let mut chunk = vec![0u8; chunk_len];
        while remaining > 0 {
            let want = usize::try_from(remaining).map_or(chunk.len(), |r| r.min(chunk.len()));
            let got = read_n(&mut self.inner, &mut chunk[..want]).await?;
            if got > 0 {
                write_n(dst, &chunk[..got]).await?;
                remaining -= got as u64;
            }
            if got < want {
                break;
            }
        }
        Ok(n - remaining)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::ReadBuf;

    use super::*;

    /// Replays a scripted sequence of read results and counts how often it is polled.
    struct Scripted {
        steps: VecDeque<io::Result<Vec<u8>>>,
        reads: usize,
    }

    impl Scripted {
        fn new(steps: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                steps: steps.into(),
                reads: 0,
            }
        }

        fn chunks(chunks: &[&[u8]]) -> Self {
            Self::new(chunks.iter().map(|c| Ok(c.to_vec())).collect())
        }
    }

    impl AsyncRead for Scripted {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            self.reads += 1;
            match self.steps.pop_front() {
                None => Poll::Ready(Ok(())),
                Some(Err(e)) => Poll::Ready(Err(e)),
                Some(Ok(mut chunk)) => {
                    let n = chunk.len().min(buf.remaining());
                    buf.put_slice(&chunk[..n]);
                    if n < chunk.len() {
                        let rest = chunk.split_off(n);
                        self.steps.push_front(Ok(rest));
                    }
                    Poll::Ready(Ok(()))
                }
            }
        }
    }

    /// Accepts at most `per_call` bytes per write, after `interrupts` interrupted calls.
    struct Trickle {
        out: Vec<u8>,
        per_call: usize,
        interrupts: usize,
        capacity: usize,
    }

    impl Trickle {
        fn new(per_call: usize) -> Self {
            Self {
                out: Vec::new(),
                per_call,
                interrupts: 0,
                capacity: usize::MAX,
            }
        }
    }

    impl AsyncWrite for Trickle {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.interrupts > 0 {
                self.interrupts -= 1;
                return Poll::Ready(Err(ErrorKind::Interrupted.into()));
            }
            let room = self.capacity - self.out.len();
            let n = buf.len().min(self.per_call).min(room);
            self.out.extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn interrupted() -> io::Result<Vec<u8>> {
        Err(ErrorKind::Interrupted.into())
    }

    #[tokio::test]
    async fn read_line_joins_lines_split_across_reads() {
        let src = Scripted::chunks(&[b"GET / HT", b"TP/1.0\r\nHost: x\r", b"\n\r\n"]);
        let mut rio = Rio::new(src);
        let mut line = Vec::new();

        assert_eq!(rio.read_line(&mut line, 1024).await.unwrap(), 16);
        assert_eq!(line, b"GET / HTTP/1.0\r\n");
        rio.read_line(&mut line, 1024).await.unwrap();
        assert_eq!(line, b"Host: x\r\n");
        rio.read_line(&mut line, 1024).await.unwrap();
        assert_eq!(line, b"\r\n");
        assert_eq!(rio.read_line(&mut line, 1024).await.unwrap(), 0);
        assert!(line.is_empty());
    }

    #[tokio::test]
    async fn read_line_refills_only_when_buffer_is_empty() {
        let src = Scripted::chunks(&[b"one\ntwo\nthree\n"]);
        let mut rio = Rio::new(src);
        let mut line = Vec::new();

        for expected in [&b"one\n"[..], b"two\n", b"three\n"] {
            rio.read_line(&mut line, 64).await.unwrap();
            assert_eq!(line, expected);
        }
        assert_eq!(rio.get_ref().reads, 1);
    }

    #[tokio::test]
    async fn read_line_with_max_len_one_never_reads() {
        let mut rio = Rio::new(Scripted::chunks(&[b"data\n"]));
        let mut line = b"stale".to_vec();

        assert_eq!(rio.read_line(&mut line, 1).await.unwrap(), 0);
        assert!(line.is_empty());
        assert_eq!(rio.read_line(&mut line, 0).await.unwrap(), 0);
        assert_eq!(rio.get_ref().reads, 0);

        rio.read_line(&mut line, 16).await.unwrap();
        assert_eq!(line, b"data\n");
    }

    #[tokio::test]
    async fn long_line_is_split_without_loss_or_duplication() {
        let mut rio = Rio::new(Scripted::chunks(&[b"abcdef", b"gh\nxy"]));
        let mut line = Vec::new();
        let mut pieces = Vec::new();

        loop {
            let n = rio.read_line(&mut line, 5).await.unwrap();
            if n == 0 {
                break;
            }
            assert!(n <= 4);
            pieces.push(line.clone());
        }

        let expected: Vec<&[u8]> = vec![b"abcd", b"efgh", b"\n", b"xy"];
        assert_eq!(pieces, expected);
        assert_eq!(pieces.concat(), b"abcdefgh\nxy");
    }

    #[tokio::test]
    async fn read_line_returns_partial_line_at_eof() {
        let mut rio = Rio::new(Scripted::chunks(&[b"no newline"]));
        let mut line = Vec::new();

        assert_eq!(rio.read_line(&mut line, 64).await.unwrap(), 10);
        assert_eq!(line, b"no newline");
        assert_eq!(rio.read_line(&mut line, 64).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn interrupted_reads_are_retried() {
        let src = Scripted::new(vec![
            interrupted(),
            Ok(b"he".to_vec()),
            interrupted(),
            interrupted(),
            Ok(b"llo\n".to_vec()),
        ]);
        let mut rio = Rio::new(src);
        let mut line = Vec::new();

        rio.read_line(&mut line, 64).await.unwrap();
        assert_eq!(line, b"hello\n");
    }

    #[tokio::test]
    async fn hard_read_errors_surface() {
        let src = Scripted::new(vec![
            Ok(b"par".to_vec()),
            Err(ErrorKind::ConnectionReset.into()),
        ]);
        let mut rio = Rio::new(src);
        let mut line = Vec::new();

        let err = rio.read_line(&mut line, 64).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionReset);
    }

    #[tokio::test]
    async fn read_n_loops_over_short_reads_and_stops_at_eof() {
        let mut src = Scripted::new(vec![Ok(b"ab".to_vec()), interrupted(), Ok(b"cd".to_vec())]);
        let mut buf = [0u8; 3];
        assert_eq!(read_n(&mut src, &mut buf).await.unwrap(), 3);
        assert_eq!(&buf, b"abc");

        let mut buf = [0u8; 8];
        assert_eq!(read_n(&mut src, &mut buf).await.unwrap(), 1);
        assert_eq!(buf[0], b'd');
    }

    #[tokio::test]
    async fn write_n_retries_partial_and_interrupted_writes() {
        let mut sink = Trickle::new(3);
        sink.interrupts = 2;

        write_n(&mut sink, b"hello, world").await.unwrap();
        assert_eq!(sink.out, b"hello, world");
    }

    #[tokio::test]
    async fn write_n_fails_when_peer_stops_accepting() {
        let mut sink = Trickle::new(4);
        sink.capacity = 6;

        let err = write_n(&mut sink, b"0123456789").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteZero);
        assert_eq!(sink.out, b"012345");
    }

    #[tokio::test]
    async fn read_buffered_drains_lookahead_before_refilling() {
        let mut rio = Rio::new(Scripted::chunks(&[b"line\nAB", b"CDE"]));
        let mut line = Vec::new();
        rio.read_line(&mut line, 64).await.unwrap();
        assert_eq!(rio.buffered(), b"AB");

        let mut out = [0u8; 4];
        assert_eq!(rio.read_buffered(&mut out).await.unwrap(), 4);
        assert_eq!(&out, b"ABCD");
        assert_eq!(rio.buffered(), b"E");
    }

    #[tokio::test]
    async fn forward_exact_stops_at_declared_length() {
        let mut rio = Rio::new(Scripted::chunks(&[b"POST\r\n\r\nx=10", b"&y=20EXTRA"]));
        let mut line = Vec::new();
        rio.read_line(&mut line, 64).await.unwrap();
        rio.read_line(&mut line, 64).await.unwrap();

        let mut sink = Trickle::new(2);
        assert_eq!(rio.forward_exact(&mut sink, 9).await.unwrap(), 9);
        assert_eq!(sink.out, b"x=10&y=20");

        let mut rest = Vec::new();
        rio.get_mut().read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"EXTRA");
    }

    #[tokio::test]
    async fn forward_exact_leaves_surplus_lookahead_buffered() {
        let mut rio = Rio::new(Scripted::chunks(&[b"\r\nABCDEFGHIJ"]));
        let mut line = Vec::new();
        rio.read_line(&mut line, 64).await.unwrap();

        let mut sink = Trickle::new(64);
        assert_eq!(rio.forward_exact(&mut sink, 4).await.unwrap(), 4);
        assert_eq!(sink.out, b"ABCD");
        assert_eq!(rio.buffered(), b"EFGHIJ");
    }

    #[tokio::test]
    async fn forward_exact_reports_short_body_at_eof() {
        let mut rio = Rio::new(Scripted::new(vec![
            Ok(b"abc".to_vec()),
            interrupted(),
            Ok(b"de".to_vec()),
        ]));

        let mut sink = Trickle::new(64);
        assert_eq!(rio.forward_exact(&mut sink, 10).await.unwrap(), 5);
        assert_eq!(sink.out, b"abcde");
    }

    #[tokio::test]
    async fn forward_exact_of_zero_touches_nothing() {
        let mut rio = Rio::new(Scripted::chunks(&[b"body"]));
        let mut sink = Trickle::new(64);

        assert_eq!(rio.forward_exact(&mut sink, 0).await.unwrap(), 0);
        assert!(sink.out.is_empty());
        assert_eq!(rio.get_ref().reads, 0);
    }

    #[tokio::test]
    async fn relay_copies_until_eof() {
        let mut src = Scripted::chunks(&[b"Content-Type: text/plain\r\n\r\n", b"hi"]);
        let mut sink = Trickle::new(5);

        assert_eq!(relay(&mut src, &mut sink).await.unwrap(), 30);
        assert_eq!(sink.out, b"Content-Type: text/plain\r\n\r\nhi");
    }
}
