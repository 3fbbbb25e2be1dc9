mod task;
mod transform;

pub use task::*;
pub use transform::*;

use core::fmt;

/// Lifecycle of a single worker.
///
/// `Created → Running → Stopped`, or straight from `Created` to `Stopped`.
/// `Stopped` is terminal: once there, `start` and `stop` are both no-ops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerState {
    Created,
    Running,
    Stopped,
}

impl WorkerState {
    pub const fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// A concurrent executor with an idempotent start/stop lifecycle.
///
/// Implementations are created by a [`WorkerFactory`](crate::WorkerFactory)
/// and owned by exactly one pool.
pub trait Worker: Send + Sync + 'static {
    /// Identity of this worker within its pool.
    fn id(&self) -> usize;

    /// Current lifecycle state.
    ///
    /// `Running` means started and not yet stopped, not that the task is still
    /// alive: a worker whose input closed or whose output receiver went away
    /// has exited but still reports `Running`.
    fn state(&self) -> WorkerState;

    /// Starts consuming input on the current tokio runtime.
    ///
    /// Only the first call on a `Created` worker has any effect. A worker that
    /// was stopped before it ever ran never starts.
    ///
    /// # Panics
    ///
    /// Implementations that spawn a task panic when called outside a tokio
    /// runtime.
    fn start(&self);

    /// Requests termination.
    ///
    /// Once this returns the worker produces no further output, even if it was
    /// parked on a full output channel. It does not wait for the worker's task
    /// to unwind; wait on the pool's
    /// [`CompletionCounter`](crate::CompletionCounter) for that.
    fn stop(&self);
}

impl<W> Worker for Box<W>
where
    W: Worker + ?Sized,
{
    fn id(&self) -> usize {
        (**self).id()
    }

    fn state(&self) -> WorkerState {
        (**self).state()
    }

    fn start(&self) {
        (**self).start();
    }

    fn stop(&self) {
        (**self).stop();
    }
}
