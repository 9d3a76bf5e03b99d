//! Reading half of a pipe

use std::error::Error as StdError;
use std::future::poll_fn;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, ReadBuf};

use super::error::PipeError;
use super::state::Shared;

/// Reading half of a [`pipe`](super::pipe)
///
/// Reads park until the paired [`PipeWriter`](super::PipeWriter) offers data
/// or closes. Dropping the reader closes it, so a writer blocked on it is
/// released with [`PipeError::Closed`].
#[derive(Debug)]
pub struct PipeReader {
    shared: Arc<Shared>,
}

impl PipeReader {
    pub(super) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Read up to `buf.len()` bytes
    ///
    /// Returns `Ok(0)` once the writer has closed cleanly and nothing is left.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, PipeError> {
        if buf.is_empty() {
            return Ok(0);
        }
        poll_fn(|cx| self.shared.poll_read(cx, buf)).await
    }

    /// Take the rest of the current write without copying
    ///
    /// Returns `Ok(None)` at end-of-stream.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, PipeError> {
        poll_fn(|cx| self.shared.poll_chunk(cx)).await
    }

    /// Close the reader; writes to the pipe fail with [`PipeError::Closed`]
    pub fn close(&self) {
        if self.shared.close_read(PipeError::Closed) {
            tracing::debug!("Pipe reader closed");
        }
    }

    /// Close the reader with an error that pending and future writes return
    pub fn close_with_error<E>(&self, err: E)
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        let err = PipeError::aborted(err);
        if self.shared.close_read(err.clone()) {
            tracing::debug!(error = %err, "Pipe reader closed with error");
        }
    }

    /// Check if the reader side has been closed
    pub fn is_closed(&self) -> bool {
        self.shared.is_read_closed()
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.shared.close_read(PipeError::Closed);
    }
}

impl AsyncRead for PipeReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let dst = buf.initialize_unfilled();
        match self.shared.poll_read(cx, dst) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(n)) => {
                buf.advance(n);
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(err)) => Poll::Ready(Err(err.into())),
        }
    }
}
