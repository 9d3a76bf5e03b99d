//! Multipipe implementation
//!
//! The fan-out core: one writer relayed to every registered reader.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};
use crate::pipe::{pipe, PipeCloser, PipeError, PipeReader, PipeWriter, WriteError};

use super::config::MultiPipeConfig;
use super::stats::{Counters, MultiPipeStats};

/// Fan-out pipe with one writer and any number of readers
///
/// Every write is handed to each registered reader in registration order and
/// completes only once all of them have consumed it. A reader registered after
/// a write has completed never sees that write.
///
/// # Example
/// ```
/// use multipipe::MultiPipe;
/// use tokio::io::AsyncReadExt;
///
/// # #[tokio::main]
/// # async fn main() -> multipipe::Result<()> {
/// let mp = MultiPipe::new();
/// let mut reader = mp.reader().await?;
///
/// let consumer = tokio::spawn(async move {
///     let mut data = Vec::new();
///     reader.read_to_end(&mut data).await.map(|_| data)
/// });
///
/// mp.write("KAMAHAMEHA!!").await?;
/// mp.close();
///
/// assert_eq!(consumer.await.unwrap()?, b"KAMAHAMEHA!!");
/// # Ok(())
/// # }
/// ```
pub struct MultiPipe {
    /// Configuration
    config: MultiPipeConfig,

    /// Set once by the first close
    closed: AtomicBool,

    /// Writer halves in registration order; held for a whole registration or write
    endpoints: tokio::sync::Mutex<Vec<PipeWriter>>,

    /// Close handles for the same endpoints, usable while a write holds `endpoints`
    closers: Mutex<Vec<PipeCloser>>,

    counters: Counters,
}

impl MultiPipe {
    /// Create a new multipipe with default configuration
    pub fn new() -> Self {
        Self::with_config(MultiPipeConfig::default())
    }

    /// Create a new multipipe with custom configuration
    pub fn with_config(config: MultiPipeConfig) -> Self {
        Self {
            endpoints: tokio::sync::Mutex::new(Vec::with_capacity(config.initial_capacity)),
            closers: Mutex::new(Vec::with_capacity(config.initial_capacity)),
            closed: AtomicBool::new(false),
            counters: Counters::default(),
            config,
        }
    }

    /// Get the multipipe configuration
    pub fn config(&self) -> &MultiPipeConfig {
        &self.config
    }

    fn lock_closers(&self) -> MutexGuard<'_, Vec<PipeCloser>> {
        self.closers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new reader
    ///
    /// The reader receives every byte written after this call returns. Waits
    /// for a write in progress to finish first.
    pub async fn reader(&self) -> Result<PipeReader> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let mut endpoints = self.endpoints.lock().await;
        let (reader, writer) = pipe();

        // Checked under the closer lock so a concurrent close either sees
        // this endpoint or this call sees the close.
        let index = {
            let mut closers = self.lock_closers();
            if self.is_closed() {
                return Err(Error::Closed);
            }
            closers.push(writer.closer());
            closers.len() - 1
        };
        endpoints.push(writer);

        tracing::debug!(
            multipipe = %self.config.label,
            reader = index,
            readers = endpoints.len(),
            "Reader registered"
        );

        Ok(reader)
    }

    /// Write a payload to every registered reader
    ///
    /// Readers are served in registration order, each one completely before
    /// the next. The first reader that fails aborts the write: readers after
    /// it do not receive this payload, readers before it already have.
    pub async fn write(&self, data: impl Into<Bytes>) -> Result<usize> {
        let data = data.into();

        if self.is_closed() {
            return Err(Error::Closed);
        }

        let mut endpoints = self.endpoints.lock().await;
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let expected = data.len();
        tracing::trace!(
            multipipe = %self.config.label,
            bytes = expected,
            readers = endpoints.len(),
            "Writing to readers"
        );

        for (index, writer) in endpoints.iter_mut().enumerate() {
            let outcome = writer.write(data.clone()).await;
            if let Err(err) = check_delivery(index, expected, outcome) {
                self.counters.record_failure();
                tracing::warn!(
                    multipipe = %self.config.label,
                    reader = index,
                    written = err.written(),
                    error = %err,
                    "Reader aborted write"
                );
                return Err(err);
            }
        }

        self.counters.record_write(expected);
        Ok(expected)
    }

    /// Write a borrowed payload to every registered reader
    pub async fn write_slice(&self, data: &[u8]) -> Result<usize> {
        self.write(Bytes::copy_from_slice(data)).await
    }

    /// Relay an upstream reader until it reaches end-of-stream
    ///
    /// Returns the number of bytes relayed. Each chunk is one multipipe
    /// write of at most `copy_buffer_size` bytes. The multipipe is left open.
    pub async fn copy_from<R>(&self, reader: &mut R) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let chunk_size = self.config.copy_buffer_size;
        let mut total = 0u64;

        loop {
            let mut chunk = BytesMut::zeroed(chunk_size);
            let n = reader.read(&mut chunk[..]).await?;
            if n == 0 {
                break;
            }

            chunk.truncate(n);
            self.write(chunk.freeze()).await?;
            total += n as u64;
        }

        Ok(total)
    }

    /// Close the multipipe; readers see end-of-stream once drained
    ///
    /// Only the first close, of either kind, has an effect.
    pub fn close(&self) {
        self.shutdown(None);
    }

    /// Close the multipipe; readers see `err` instead of end-of-stream
    ///
    /// The error goes to the readers, not to the caller. Only the first
    /// close, of either kind, has an effect.
    pub fn close_with_error<E>(&self, err: E)
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if !self.is_closed() {
            self.shutdown(Some(PipeError::aborted(err)));
        }
    }

    fn shutdown(&self, err: Option<PipeError>) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        // Never waits on `endpoints`: a write stalled on a slow reader is
        // released by the closes below.
        let closers = self.lock_closers();
        for closer in closers.iter() {
            match &err {
                None => closer.close(),
                Some(err) => closer.close_with_error(err.clone()),
            };
        }

        match &err {
            None => tracing::info!(
                multipipe = %self.config.label,
                readers = closers.len(),
                "Multipipe closed"
            ),
            Some(err) => tracing::info!(
                multipipe = %self.config.label,
                readers = closers.len(),
                error = %err,
                "Multipipe closed with error"
            ),
        }
    }

    /// Check if the multipipe has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get the number of registered readers
    pub fn reader_count(&self) -> usize {
        self.lock_closers().len()
    }

    /// Get multipipe statistics
    pub fn stats(&self) -> MultiPipeStats {
        self.counters.snapshot(self.reader_count(), self.is_closed())
    }
}

impl Default for MultiPipe {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MultiPipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiPipe")
            .field("label", &self.config.label)
            .field("readers", &self.reader_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Map one reader's write outcome to the multipipe result
fn check_delivery(
    index: usize,
    expected: usize,
    outcome: std::result::Result<usize, WriteError>,
) -> Result<()> {
    match outcome {
        Ok(written) if written == expected => Ok(()),
        Ok(written) => Err(Error::ShortWrite {
            index,
            written,
            expected,
        }),
        Err(err) => Err(Error::Endpoint {
            index,
            written: err.written,
            source: err.source,
        }),
    }
}
