//! Error types for the worker pool.
//!
//! Almost every pool operation is infallible. The exceptions are shrinking a
//! pool by more workers than it holds, and the stream pool's output sink
//! failing or its listener task not completing.
//!
//! ## Error Cases
//! - `OutOfRange`: `drop_workers` asked for more workers than exist. The pool
//!   is left untouched.
//! - `Sink`: the writer behind a `StreamWorkerPool` returned an I/O error.
//! - `ListenerJoin`: the stream pool's listener task panicked or was aborted.

use tokio::task::JoinError;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the worker pool.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Attempted to drop more workers than are currently in the pool.
    #[error("Cannot drop {requested} workers: the pool only has {available}")]
    OutOfRange { requested: usize, available: usize },

    /// The output sink failed while writing a record.
    #[error("Output sink error: {0}")]
    Sink(#[from] std::io::Error),

    /// The output listener task did not run to completion.
    #[error("Output listener failed to complete: {0}")]
    ListenerJoin(#[from] JoinError),
}
