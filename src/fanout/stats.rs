//! Multipipe statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a multipipe's counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiPipeStats {
    /// Readers registered so far
    pub reader_count: usize,
    /// Payload bytes of completed writes (counted once, not per reader)
    pub bytes_written: u64,
    /// Writes delivered to every reader
    pub writes: u64,
    /// Writes aborted by a failing reader
    pub failed_writes: u64,
    /// Whether the multipipe has been closed
    pub closed: bool,
}

/// Live counters updated by the write path
#[derive(Debug, Default)]
pub(super) struct Counters {
    bytes_written: AtomicU64,
    writes: AtomicU64,
    failed_writes: AtomicU64,
}

impl Counters {
    pub(super) fn record_write(&self, len: usize) {
        self.bytes_written.fetch_add(len as u64, Ordering::Relaxed);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_failure(&self) {
        self.failed_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn snapshot(&self, reader_count: usize, closed: bool) -> MultiPipeStats {
        MultiPipeStats {
            reader_count,
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            failed_writes: self.failed_writes.load(Ordering::Relaxed),
            closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = Counters::default();
        counters.record_write(12);
        counters.record_write(2);
        counters.record_failure();

        let stats = counters.snapshot(3, false);
        assert_eq!(stats.reader_count, 3);
        assert_eq!(stats.bytes_written, 14);
        assert_eq!(stats.writes, 2);
        assert_eq!(stats.failed_writes, 1);
        assert!(!stats.closed);
    }
}
