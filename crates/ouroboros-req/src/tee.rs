//! Pass-through reader that mirrors a bounded prefix for diagnostics

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

/// Upper bound on how much of a streamed request body is kept for dumps
pub const CAPTURE_LIMIT: usize = 100 * 1024;

/// Wraps a reader, handing every byte through unchanged while copying at
/// most `limit` bytes into a side buffer.
#[derive(Debug)]
pub struct TeeReader<R> {
    inner: R,
    captured: Vec<u8>,
    limit: usize,
}

impl<R> TeeReader<R> {
    pub fn new(inner: R, limit: usize) -> Self {
        Self {
            inner,
            captured: Vec::with_capacity(limit.min(8 * 1024)),
            limit,
        }
    }

    /// Bytes mirrored so far; never longer than the limit
    pub fn captured(&self) -> &[u8] {
        &self.captured
    }

    pub fn into_parts(self) -> (R, Vec<u8>) {
        (self.inner, self.captured)
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for TeeReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        let chunk = &buf.filled()[before..];
        let left = this.limit.saturating_sub(this.captured.len());
        if left > 0 && !chunk.is_empty() {
            let n = chunk.len().min(left);
            this.captured.extend_from_slice(&chunk[..n]);
        }
        Poll::Ready(Ok(()))
    }
}

/// Drain `reader` once through a tee.
///
/// Returns the full content (what goes on the wire) and the capped prefix
/// (what diagnostics get to see).
pub(crate) async fn drain<R: AsyncRead + Unpin>(reader: R) -> io::Result<(Bytes, Bytes)> {
    let mut tee = TeeReader::new(reader, CAPTURE_LIMIT);
    let mut full = Vec::new();
    tee.read_to_end(&mut full).await?;
    let (_, captured) = tee.into_parts();
    Ok((Bytes::from(full), Bytes::from(captured)))
}
