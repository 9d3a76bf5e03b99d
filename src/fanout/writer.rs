//! `AsyncWrite` adapter for a multipipe

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use tokio::io::AsyncWrite;

use crate::error::{Error, Result};

use super::store::MultiPipe;

type WriteFuture = Pin<Box<dyn Future<Output = Result<usize>> + Send>>;

/// Writer handle that lets a [`MultiPipe`] be used as an [`AsyncWrite`]
///
/// Works like `tokio::fs::File`: `poll_write` takes the whole buffer and
/// starts a multipipe write for it, and that write is driven to completion
/// by the next `poll_write`, `poll_flush` or `poll_shutdown`. At most one
/// write is in flight, so nothing beyond it is buffered. A failure of the
/// in-flight write is reported by whichever of those calls completes it.
///
/// Shutting the handle down closes the multipipe. Dropping it with a write
/// in flight cancels that write.
///
/// ```no_run
/// use std::sync::Arc;
///
/// use multipipe::MultiPipe;
/// use tokio::io::AsyncWriteExt;
///
/// # async fn example() -> std::io::Result<()> {
/// let mp = Arc::new(MultiPipe::new());
/// let mut writer = mp.writer();
///
/// tokio::io::copy(&mut tokio::io::stdin(), &mut writer).await?;
/// writer.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct MultiPipeWriter {
    mp: Arc<MultiPipe>,
    in_flight: Option<WriteFuture>,
}

impl MultiPipeWriter {
    /// Create a writer handle for `mp`
    pub fn new(mp: Arc<MultiPipe>) -> Self {
        Self { mp, in_flight: None }
    }

    /// Get the multipipe this handle writes to
    pub fn multipipe(&self) -> &Arc<MultiPipe> {
        &self.mp
    }

    /// Drive the in-flight write, if any, to completion
    fn poll_in_flight(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if let Some(write) = self.in_flight.as_mut() {
            let outcome = ready!(write.as_mut().poll(cx));
            self.in_flight = None;
            if let Err(err) = outcome {
                return Poll::Ready(Err(err.into()));
            }
        }
        Poll::Ready(Ok(()))
    }
}

impl MultiPipe {
    /// Get an [`AsyncWrite`] handle for this multipipe
    pub fn writer(self: &Arc<Self>) -> MultiPipeWriter {
        MultiPipeWriter::new(Arc::clone(self))
    }
}

impl AsyncWrite for MultiPipeWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(this.poll_in_flight(cx))?;

        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }
        if this.mp.is_closed() {
            return Poll::Ready(Err(Error::Closed.into()));
        }

        let mp = Arc::clone(&this.mp);
        let data = Bytes::copy_from_slice(buf);
        let mut write: WriteFuture = Box::pin(async move { mp.write(data).await });

        match write.as_mut().poll(cx) {
            Poll::Ready(Err(err)) => return Poll::Ready(Err(err.into())),
            Poll::Ready(Ok(_)) => {}
            Poll::Pending => this.in_flight = Some(write),
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().poll_in_flight(cx)
    }

    /// Finishes the in-flight write, then closes the multipipe
    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let flushed = ready!(this.poll_in_flight(cx));
        this.mp.close();
        Poll::Ready(flushed)
    }
}

impl std::fmt::Debug for MultiPipeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiPipeWriter")
            .field("multipipe", &self.mp)
            .field("in_flight", &self.in_flight.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready};

    use super::*;

    const PAYLOAD: &[u8] = b"KAMAHAMEHA!!";

    #[tokio::test]
    async fn test_copy_into_multipipe() {
        let mp = Arc::new(MultiPipe::new());

        let mut consumers = Vec::new();
        for _ in 0..3 {
            let mut reader = mp.reader().await.unwrap();
            consumers.push(tokio::spawn(async move {
                let mut data = Vec::new();
                reader.read_to_end(&mut data).await.map(|_| data)
            }));
        }

        let mut writer = mp.writer();
        let n = tokio::io::copy(&mut &PAYLOAD[..], &mut writer).await.unwrap();
        assert_eq!(n, PAYLOAD.len() as u64);
        writer.shutdown().await.unwrap();

        assert!(mp.is_closed());
        for consumer in consumers {
            assert_eq!(consumer.await.unwrap().unwrap(), PAYLOAD);
        }
    }

    #[tokio::test]
    async fn test_flush_waits_for_readers() {
        let mp = Arc::new(MultiPipe::new());
        let mut reader = mp.reader().await.unwrap();
        let mut writer = mp.writer();

        // The buffer is taken at once; delivery happens on flush
        let mut write = task::spawn(writer.write(PAYLOAD));
        assert_eq!(assert_ready!(write.poll()).unwrap(), PAYLOAD.len());
        drop(write);

        let mut flush = task::spawn(writer.flush());
        assert_pending!(flush.poll());

        let chunk = reader.next_chunk().await.unwrap();
        assert_eq!(chunk, Some(Bytes::from_static(PAYLOAD)));

        assert!(flush.is_woken());
        assert_ready!(flush.poll()).unwrap();
        assert_eq!(mp.stats().writes, 1);
    }

    #[tokio::test]
    async fn test_reader_error_surfaces_on_flush() {
        let mp = Arc::new(MultiPipe::new());
        let reader = mp.reader().await.unwrap();
        let mut writer = mp.writer();

        let mut write = task::spawn(writer.write(PAYLOAD));
        assert_eq!(assert_ready!(write.poll()).unwrap(), PAYLOAD.len());
        drop(write);

        reader.close_with_error("downstream error");

        let err = writer.flush().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(err.to_string(), "downstream error");
        assert_eq!(mp.stats().failed_writes, 1);
    }

    #[tokio::test]
    async fn test_closed_reader_fails_write() {
        let mp = Arc::new(MultiPipe::new());
        let reader = mp.reader().await.unwrap();
        reader.close();

        let err = mp.writer().write_all(PAYLOAD).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_write_after_close_is_broken_pipe() {
        let mp = Arc::new(MultiPipe::new());
        mp.close();

        let err = mp.writer().write_all(PAYLOAD).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(err.to_string(), "multipipe: closed multipipe");
    }
}
