//! Writing half of a pipe

use std::error::Error as StdError;
use std::future::poll_fn;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::AsyncWrite;

use super::error::{PipeError, WriteError};
use super::state::Shared;

/// Writing half of a [`pipe`](super::pipe)
///
/// Each write parks until the paired [`PipeReader`](super::PipeReader) has
/// consumed the whole payload, or until either side is closed. Dropping the
/// writer closes it cleanly.
#[derive(Debug)]
pub struct PipeWriter {
    shared: Arc<Shared>,
}

impl PipeWriter {
    pub(super) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Write a payload, waiting until the reader has consumed all of it
    ///
    /// On failure the error carries the number of bytes the reader took
    /// before the pipe was closed. If the returned future is dropped before
    /// completion, the unconsumed remainder is withdrawn.
    pub async fn write(&mut self, data: Bytes) -> Result<usize, WriteError> {
        let _withdraw = WithdrawOnDrop(&self.shared);
        let mut pending = Some(data);

        poll_fn(|cx| self.shared.poll_offer(cx, &mut pending)).await
    }

    /// Write a borrowed payload
    pub async fn write_slice(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        self.write(Bytes::copy_from_slice(data)).await
    }

    /// Close the writer; the reader sees end-of-stream
    pub fn close(&self) {
        self.closer().close();
    }

    /// Close the writer with an error; the reader sees `err` instead of end-of-stream
    pub fn close_with_error<E>(&self, err: E)
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        self.closer().close_with_error(PipeError::aborted(err));
    }

    /// Check if the writer side has been closed
    pub fn is_closed(&self) -> bool {
        self.shared.is_write_closed()
    }

    /// Handle that can close this writer while a write holds it
    pub(crate) fn closer(&self) -> PipeCloser {
        PipeCloser {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        if self.shared.close_write(None) {
            tracing::trace!("Pipe writer dropped, reader will see end-of-stream");
        }
    }
}

impl AsyncWrite for PipeWriter {
    /// Hands `buf` over once the reader is waiting for data
    ///
    /// `Pending` leaves nothing behind for the reader. `Ready(Ok(n))` means
    /// the bytes now sit in the slot for the parked reader; `poll_flush`
    /// waits until it has taken them.
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.shared.poll_commit(cx, buf).map_err(io::Error::from)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.shared.poll_drain(cx).map_err(io::Error::from)
    }

    /// Closes the writer; bytes already handed over are still delivered
    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.close();
        Poll::Ready(Ok(()))
    }
}

/// Withdraws an outstanding offer when a write future is dropped early
struct WithdrawOnDrop<'a>(&'a Shared);

impl Drop for WithdrawOnDrop<'_> {
    fn drop(&mut self) {
        self.0.cancel_offer();
    }
}

/// Close handle for the writer side of a pipe
///
/// Closing goes through the shared state only, so it never waits for a
/// write in progress; the write observes the close and returns.
#[derive(Debug, Clone)]
pub(crate) struct PipeCloser {
    shared: Arc<Shared>,
}

impl PipeCloser {
    /// Close cleanly. Returns false if the writer was already closed.
    pub(crate) fn close(&self) -> bool {
        let closed = self.shared.close_write(None);
        if closed {
            tracing::debug!("Pipe writer closed");
        }
        closed
    }

    /// Close with an error. Returns false if the writer was already closed.
    pub(crate) fn close_with_error(&self, err: PipeError) -> bool {
        let closed = self.shared.close_write(Some(err.clone()));
        if closed {
            tracing::debug!(error = %err, "Pipe writer closed with error");
        }
        closed
    }
}
