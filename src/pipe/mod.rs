//! Backpressure-coupled in-memory pipe
//!
//! A pipe connects one [`PipeWriter`] to one [`PipeReader`] with no internal
//! buffer. A write parks until the reader has consumed the whole payload, so
//! the writer can never run ahead of its reader.
//!
//! ```text
//!   PipeWriter::write(data)          PipeReader::read(buf)
//!          │                                 │
//!          ▼                                 ▼
//!   ┌─────────────┐   slot: Bytes    ┌─────────────┐
//!   │ offer data  │ ───────────────► │ copy out of │
//!   │ park writer │ ◄─────────────── │ slot, wake  │
//!   └─────────────┘   slot empty     │ writer      │
//!                                    └─────────────┘
//! ```
//!
//! Closing the writer delivers end-of-stream (or the supplied error) to the
//! reader. Closing the reader makes pending and future writes fail.

pub mod error;
pub mod reader;
pub(crate) mod state;
pub mod writer;

use std::sync::Arc;

pub use error::{PipeError, WriteError};
pub use reader::PipeReader;
pub(crate) use writer::PipeCloser;
pub use writer::PipeWriter;

use state::Shared;

/// Create a connected reader/writer pair
pub fn pipe() -> (PipeReader, PipeWriter) {
    let shared = Arc::new(Shared::new());
    (
        PipeReader::new(Arc::clone(&shared)),
        PipeWriter::new(shared),
    )
}
