//! Synchronous fan-out pipe
//!
//! A [`MultiPipe`] replicates a single byte stream, in order, to any number of
//! independently consumed readers. There is no buffering: each write waits
//! until every reader registered before it has consumed the payload, so the
//! slowest reader sets the pace. Readers registered later only see later
//! writes.
//!
//! The building block is [`pipe::pipe`], an in-memory reader/writer pair
//! whose writes park until the reader has taken the data.
//!
//! ```no_run
//! use multipipe::MultiPipe;
//! use tokio::io::AsyncReadExt;
//!
//! # async fn example() -> multipipe::Result<()> {
//! let mp = MultiPipe::new();
//!
//! for id in 0..3 {
//!     let mut reader = mp.reader().await?;
//!     tokio::spawn(async move {
//!         let mut data = Vec::new();
//!         let _ = reader.read_to_end(&mut data).await;
//!         println!("reader {} got {} bytes", id, data.len());
//!     });
//! }
//!
//! mp.copy_from(&mut tokio::io::stdin()).await?;
//! mp.close();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod fanout;
pub mod pipe;

pub use error::{Error, Result};
pub use fanout::{MultiPipe, MultiPipeConfig, MultiPipeStats, MultiPipeWriter};
pub use pipe::{pipe, PipeError, PipeReader, PipeWriter, WriteError};
