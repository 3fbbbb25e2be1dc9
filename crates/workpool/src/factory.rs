//! Worker construction, the pool's only extension point.
//!
//! A pool never builds workers itself. It hands a [`WorkerContext`] (identity
//! plus the shared channels and completion counter) to its
//! [`WorkerFactory`] and takes ownership of whatever comes back. Closures
//! taking a `WorkerContext` are factories too, which makes it easy to return
//! boxed workers of mixed types.

use crate::{
    channel::{OutputSender, SharedReceiver},
    counter::CompletionCounter,
    worker::{Greeting, Transform, TransformWorker, Worker},
};
use std::sync::Arc;

/// Everything a new worker needs from its pool.
pub struct WorkerContext<I, O> {
    /// Identity of the worker, unique among the pool's live workers.
    pub id: usize,
    /// The pool's shared completion counter.
    pub counter: CompletionCounter,
    /// Shared input channel.
    pub input: SharedReceiver<I>,
    /// Shared output channel.
    pub output: OutputSender<O>,
}

/// Builds workers for a pool.
pub trait WorkerFactory<I, O>: Send + Sync {
    type Worker: Worker;

    fn create(&self, ctx: WorkerContext<I, O>) -> Self::Worker;
}

impl<I, O, W, F> WorkerFactory<I, O> for F
where
    F: Fn(WorkerContext<I, O>) -> W + Send + Sync,
    W: Worker,
{
    type Worker = W;

    fn create(&self, ctx: WorkerContext<I, O>) -> W {
        self(ctx)
    }
}

/// Factory for [`TransformWorker`]s sharing one transform.
#[derive(Debug, Default)]
pub struct TransformWorkerFactory<T> {
    transform: Arc<T>,
}

/// Factory for [`SimpleWorker`](crate::SimpleWorker)s.
pub type SimpleWorkerFactory = TransformWorkerFactory<Greeting>;

impl<T> TransformWorkerFactory<T> {
    pub fn new(transform: T) -> Self {
        Self {
            transform: Arc::new(transform),
        }
    }
}

impl<T> Clone for TransformWorkerFactory<T> {
    fn clone(&self) -> Self {
        Self {
            transform: Arc::clone(&self.transform),
        }
    }
}

impl<I, O, T> WorkerFactory<I, O> for TransformWorkerFactory<T>
where
    I: Send + 'static,
    O: Send + 'static,
    T: Transform<I, O>,
{
    type Worker = TransformWorker<I, O, T>;

    fn create(&self, ctx: WorkerContext<I, O>) -> Self::Worker {
        TransformWorker::new(ctx, Arc::clone(&self.transform))
    }
}

/// Returns the factory for the default greeting worker.
pub fn simple_worker_factory() -> SimpleWorkerFactory {
    TransformWorkerFactory::new(Greeting)
}
