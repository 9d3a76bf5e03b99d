//! Fan-out of one writer to many readers
//!
//! A [`MultiPipe`] owns the writer half of one [`pipe`](crate::pipe::pipe) per
//! registered reader. Each write is pushed through those pipes one after the
//! other, so it completes only when the slowest reader has consumed it.
//!
//! # Architecture
//!
//! ```text
//!                         MultiPipe
//!               ┌────────────────────────────┐
//!   write() ──► │ endpoints: [PipeWriter; N] │
//!               │ closers:   [PipeCloser; N] │ ◄── close()
//!               └──────┬─────────┬───────┬───┘
//!                      │         │       │
//!                      ▼         ▼       ▼
//!                 PipeReader PipeReader PipeReader
//!                   task 0     task 1    task N-1
//! ```
//!
//! # Zero-Copy Design
//!
//! The payload of a write is a single `bytes::Bytes`. Every endpoint receives a
//! reference-counted handle to the same allocation; readers using
//! [`PipeReader::next_chunk`](crate::pipe::PipeReader::next_chunk) take it
//! without copying.
//!
//! [`MultiPipeWriter`] wraps a shared multipipe as a `tokio::io::AsyncWrite`,
//! so it can be the target of `tokio::io::copy`.

pub mod config;
pub mod stats;
pub mod store;
pub mod writer;

pub use config::MultiPipeConfig;
pub use stats::MultiPipeStats;
pub use store::MultiPipe;
pub use writer::MultiPipeWriter;
