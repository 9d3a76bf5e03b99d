//! Error types for multipipe operations

use crate::pipe::PipeError;

/// Error type for [`MultiPipe`](crate::MultiPipe) operations
#[derive(Debug)]
pub enum Error {
    /// The multipipe has been closed
    Closed,
    /// An endpoint reported success but accepted fewer bytes than offered
    ShortWrite {
        /// Registration index of the endpoint
        index: usize,
        /// Bytes the endpoint accepted
        written: usize,
        /// Bytes offered
        expected: usize,
    },
    /// An endpoint failed; later endpoints did not receive the write
    Endpoint {
        /// Registration index of the endpoint
        index: usize,
        /// Bytes this endpoint accepted before failing
        written: usize,
        /// The endpoint's error, unchanged
        source: PipeError,
    },
    /// Reading the upstream source failed
    Io(std::io::Error),
}

impl Error {
    /// Bytes accepted by the failing endpoint
    ///
    /// Zero when no endpoint was involved.
    pub fn written(&self) -> usize {
        match self {
            Error::ShortWrite { written, .. } | Error::Endpoint { written, .. } => *written,
            Error::Closed | Error::Io(_) => 0,
        }
    }

    /// The endpoint's error, if an endpoint failed
    pub fn endpoint_error(&self) -> Option<&PipeError> {
        match self {
            Error::Endpoint { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Check if this is the closed-multipipe error
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Closed => write!(f, "multipipe: closed multipipe"),
            Error::ShortWrite {
                index,
                written,
                expected,
            } => write!(
                f,
                "short write on reader {}: {} of {} bytes",
                index, written, expected
            ),
            Error::Endpoint { source, .. } => write!(f, "{}", source),
            Error::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Endpoint { source, .. } => Some(source),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Closed => std::io::Error::new(std::io::ErrorKind::BrokenPipe, err),
            Error::Endpoint { source, .. } => source.into(),
            Error::Io(e) => e,
            Error::ShortWrite { .. } => std::io::Error::new(std::io::ErrorKind::WriteZero, err),
        }
    }
}

/// Result type alias for multipipe operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_counts() {
        assert_eq!(Error::Closed.written(), 0);

        let short = Error::ShortWrite {
            index: 1,
            written: 3,
            expected: 12,
        };
        assert_eq!(short.written(), 3);

        let endpoint = Error::Endpoint {
            index: 0,
            written: 5,
            source: PipeError::Closed,
        };
        assert_eq!(endpoint.written(), 5);
        assert!(endpoint.endpoint_error().unwrap().is_closed());
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::Closed.to_string(), "multipipe: closed multipipe");

        let endpoint = Error::Endpoint {
            index: 0,
            written: 0,
            source: PipeError::aborted("downstream error"),
        };
        assert_eq!(endpoint.to_string(), "downstream error");
    }

    #[test]
    fn test_into_io_error() {
        let closed: std::io::Error = Error::Closed.into();
        assert_eq!(closed.kind(), std::io::ErrorKind::BrokenPipe);
        assert_eq!(closed.to_string(), "multipipe: closed multipipe");

        let endpoint: std::io::Error = Error::Endpoint {
            index: 2,
            written: 0,
            source: PipeError::aborted("downstream error"),
        }
        .into();
        assert_eq!(endpoint.kind(), std::io::ErrorKind::Other);
        assert_eq!(endpoint.to_string(), "downstream error");

        let upstream: std::io::Error =
            Error::Io(std::io::Error::from(std::io::ErrorKind::UnexpectedEof)).into();
        assert_eq!(upstream.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
