//! Worker pools.
//!
//! ## Structure
//!
//! - [`manager`] - [`WorkerPool`], a resizable set of workers over caller-owned
//!   channels.
//! - [`stream`] - [`StreamWorkerPool`], a pool that owns its output channel and
//!   forwards every record as a line to an async writer.

mod manager;
mod stream;

pub use manager::*;
pub use stream::*;

use crate::Result;

/// Membership operations shared by every pool flavour.
///
/// All operations are synchronous and serialized by the pool; none of them
/// waits for worker tasks to unwind.
pub trait Pool {
    /// Creates `count` workers, numbering them from the current worker count,
    /// and starts each one.
    fn add_workers_and_start(&self, count: usize);

    /// Stops and removes the `count` most recently added workers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`](crate::Error::OutOfRange) when `count`
    /// exceeds the current worker count. The pool is left unchanged.
    fn drop_workers(&self, count: usize) -> Result<()>;

    /// Stops and removes every worker. The pool remains usable.
    fn stop(&self);

    /// Number of workers currently in the pool.
    fn num_workers(&self) -> usize;
}
