//! Pipe error types

use std::error::Error as StdError;
use std::sync::Arc;

/// Error observed on one side of a pipe
///
/// Cheap to clone: a single close error is handed to every pending and future
/// operation on the peer side.
#[derive(Debug, Clone)]
pub enum PipeError {
    /// The pipe was closed without an error
    Closed,
    /// The peer closed its side with this error
    Aborted(Arc<dyn StdError + Send + Sync>),
}

impl PipeError {
    /// Wrap an arbitrary error as a close reason
    pub fn aborted<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        PipeError::Aborted(Arc::from(err.into()))
    }

    /// Get the close reason, if the peer supplied one
    pub fn reason(&self) -> Option<&Arc<dyn StdError + Send + Sync>> {
        match self {
            PipeError::Closed => None,
            PipeError::Aborted(reason) => Some(reason),
        }
    }

    /// Check if this is a plain close
    pub fn is_closed(&self) -> bool {
        matches!(self, PipeError::Closed)
    }
}

impl std::fmt::Display for PipeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipeError::Closed => write!(f, "io: read/write on closed pipe"),
            PipeError::Aborted(reason) => write!(f, "{}", reason),
        }
    }
}

impl StdError for PipeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            PipeError::Closed => None,
            PipeError::Aborted(reason) => Some(reason.as_ref()),
        }
    }
}

impl From<PipeError> for std::io::Error {
    fn from(err: PipeError) -> Self {
        match err {
            PipeError::Closed => std::io::Error::new(std::io::ErrorKind::BrokenPipe, err),
            PipeError::Aborted(_) => std::io::Error::other(err),
        }
    }
}

/// Error returned by a pipe write
///
/// Carries the number of bytes the reader consumed before the failure.
#[derive(Debug, Clone)]
pub struct WriteError {
    /// Bytes consumed by the reader before the error
    pub written: usize,
    /// Why the write stopped
    pub source: PipeError,
}

impl WriteError {
    pub(crate) fn new(written: usize, source: PipeError) -> Self {
        Self { written, source }
    }
}

impl std::fmt::Display for WriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (after {} bytes)", self.source, self.written)
    }
}

impl StdError for WriteError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}
