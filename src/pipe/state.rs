//! Shared state between the two halves of a pipe
//!
//! The pipe holds at most one outstanding offer. The writer places its payload
//! in the slot and parks until the reader has drained it; the reader copies out
//! of the slot and wakes the writer once it is empty. Nothing is buffered
//! beyond the payload of the write currently in progress.
//!
//! `AsyncWrite` callers cannot have an offer outstanding across a `Pending`,
//! so their bytes only enter the slot while the reader is parked on it. Those
//! bytes are committed: the writer has been told they were written, and a
//! clean close leaves them for the reader to drain.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use bytes::{Buf, Bytes};

use super::error::{PipeError, WriteError};

/// Mutable pipe state, guarded by the mutex in [`Shared`]
#[derive(Debug, Default)]
struct PipeState {
    /// Unconsumed part of the current offer
    slot: Bytes,
    /// Whether a writer has an outstanding offer
    offering: bool,
    /// Whether the slot holds bytes already reported as written
    committed: bool,
    /// Bytes of the current offer taken by the reader
    consumed: usize,
    /// `Some(None)` after a clean writer close, `Some(Some(e))` after close-with-error
    write_closed: Option<Option<PipeError>>,
    /// Error handed to writers once the reader side is closed
    read_closed: Option<PipeError>,
    read_waker: Option<Waker>,
    write_waker: Option<Waker>,
}

impl PipeState {
    /// Error a writer observes, if either side has been closed
    fn write_error(&self) -> Option<PipeError> {
        if self.write_closed.is_some() {
            return Some(PipeError::Closed);
        }
        self.read_closed.clone()
    }

    /// Drop the current offer without touching the close flags
    fn withdraw(&mut self) -> usize {
        let consumed = self.consumed;
        self.slot = Bytes::new();
        self.offering = false;
        self.consumed = 0;
        consumed
    }

    fn wake_reader(&mut self) {
        if let Some(waker) = self.read_waker.take() {
            waker.wake();
        }
    }

    fn wake_writer(&mut self) {
        if let Some(waker) = self.write_waker.take() {
            waker.wake();
        }
    }

    /// Register `waker` unless it would wake the same task as the stored one
    fn park(slot: &mut Option<Waker>, waker: &Waker) {
        match slot {
            Some(current) if current.will_wake(waker) => {}
            _ => *slot = Some(waker.clone()),
        }
    }
}

/// State shared by a [`PipeReader`](super::PipeReader) and its
/// [`PipeWriter`](super::PipeWriter)
#[derive(Debug, Default)]
pub(crate) struct Shared {
    state: Mutex<PipeState>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PipeState> {
        // The critical sections never panic halfway through an update
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drive a write
    ///
    /// `pending` holds the payload on the first poll and is taken when the
    /// offer is placed. Later polls wait for the reader to drain the slot.
    pub(crate) fn poll_offer(
        &self,
        cx: &mut Context<'_>,
        pending: &mut Option<Bytes>,
    ) -> Poll<Result<usize, WriteError>> {
        let mut state = self.lock();

        if pending.is_some() {
            if let Some(err) = state.write_error() {
                *pending = None;
                return Poll::Ready(Err(WriteError::new(0, err)));
            }
            if !state.slot.is_empty() {
                // Committed bytes from an earlier `poll_write` are still draining
                PipeState::park(&mut state.write_waker, cx.waker());
                return Poll::Pending;
            }
        }

        if let Some(data) = pending.take() {
            if data.is_empty() {
                return Poll::Ready(Ok(0));
            }

            state.slot = data;
            state.offering = true;
            state.committed = false;
            state.consumed = 0;
            state.wake_reader();
        }

        if !state.offering {
            return Poll::Ready(Ok(0));
        }

        if let Some(err) = state.write_error() {
            let written = state.withdraw();
            return Poll::Ready(Err(WriteError::new(written, err)));
        }

        if state.slot.is_empty() {
            let written = state.withdraw();
            return Poll::Ready(Ok(written));
        }

        PipeState::park(&mut state.write_waker, cx.waker());
        Poll::Pending
    }

    /// Abandon an outstanding offer, e.g. when the write future is dropped
    pub(crate) fn cancel_offer(&self) {
        let mut state = self.lock();
        if state.offering {
            state.withdraw();
        }
    }

    /// Hand `buf` to a parked reader
    ///
    /// Returns `Pending` without touching the slot unless a reader is waiting
    /// on an empty slot, so an abandoned call leaves nothing behind.
    pub(crate) fn poll_commit(
        &self,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, PipeError>> {
        let mut state = self.lock();

        if let Some(err) = state.write_error() {
            return Poll::Ready(Err(err));
        }
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        if state.slot.is_empty() && state.read_waker.is_some() {
            state.slot = Bytes::copy_from_slice(buf);
            state.committed = true;
            state.wake_reader();
            return Poll::Ready(Ok(buf.len()));
        }

        PipeState::park(&mut state.write_waker, cx.waker());
        Poll::Pending
    }

    /// Wait until committed bytes have been taken by the reader
    pub(crate) fn poll_drain(&self, cx: &mut Context<'_>) -> Poll<Result<(), PipeError>> {
        let mut state = self.lock();

        if !state.committed {
            return Poll::Ready(Ok(()));
        }
        // A clean writer close still lets the reader drain, so only the
        // reader side can fail a flush
        if let Some(err) = state.read_closed.clone() {
            return Poll::Ready(Err(err));
        }

        PipeState::park(&mut state.write_waker, cx.waker());
        Poll::Pending
    }

    /// Copy from the current offer into `buf`
    pub(crate) fn poll_read(
        &self,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<Result<usize, PipeError>> {
        let mut state = self.lock();

        if state.read_closed.is_some() {
            return Poll::Ready(Err(PipeError::Closed));
        }

        if !state.slot.is_empty() {
            let n = buf.len().min(state.slot.len());
            state.slot.copy_to_slice(&mut buf[..n]);
            state.consumed += n;
            if state.slot.is_empty() {
                state.committed = false;
                state.wake_writer();
            }
            return Poll::Ready(Ok(n));
        }

        match state.write_closed.clone() {
            Some(None) => Poll::Ready(Ok(0)),
            Some(Some(err)) => Poll::Ready(Err(err)),
            None => {
                PipeState::park(&mut state.read_waker, cx.waker());
                // A writer blocked in `poll_commit` can hand over now
                state.wake_writer();
                Poll::Pending
            }
        }
    }

    /// Take the whole current offer without copying
    ///
    /// Resolves to `None` at end-of-stream.
    pub(crate) fn poll_chunk(
        &self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Bytes>, PipeError>> {
        let mut state = self.lock();

        if state.read_closed.is_some() {
            return Poll::Ready(Err(PipeError::Closed));
        }

        if !state.slot.is_empty() {
            let chunk = std::mem::take(&mut state.slot);
            state.consumed += chunk.len();
            state.committed = false;
            state.wake_writer();
            return Poll::Ready(Ok(Some(chunk)));
        }

        match state.write_closed.clone() {
            Some(None) => Poll::Ready(Ok(None)),
            Some(Some(err)) => Poll::Ready(Err(err)),
            None => {
                PipeState::park(&mut state.read_waker, cx.waker());
                // A writer blocked in `poll_commit` can hand over now
                state.wake_writer();
                Poll::Pending
            }
        }
    }

    /// Close the writer side
    ///
    /// Returns false if it was already closed.
    pub(crate) fn close_write(&self, err: Option<PipeError>) -> bool {
        let mut state = self.lock();
        if state.write_closed.is_some() {
            return false;
        }

        // An offer that was not fully consumed is never delivered. Committed
        // bytes survive a clean close and are drained before end-of-stream.
        if err.is_some() || !state.committed {
            state.slot = Bytes::new();
            state.committed = false;
        }
        state.write_closed = Some(err);
        state.wake_reader();
        state.wake_writer();
        true
    }

    /// Close the reader side
    ///
    /// Returns false if it was already closed.
    pub(crate) fn close_read(&self, err: PipeError) -> bool {
        let mut state = self.lock();
        if state.read_closed.is_some() {
            return false;
        }

        // Committed bytes are lost; `committed` stays set so a pending flush fails
        state.read_closed = Some(err);
        state.slot = Bytes::new();
        state.wake_reader();
        state.wake_writer();
        true
    }

    pub(crate) fn is_write_closed(&self) -> bool {
        self.lock().write_closed.is_some()
    }

    pub(crate) fn is_read_closed(&self) -> bool {
        self.lock().read_closed.is_some()
    }
}
