//! Resizable pool of workers sharing one input/output channel pair.
//!
//! This module defines [`WorkerPool`], which owns an ordered sequence of
//! workers built by a [`WorkerFactory`]. Workers can be added and dropped at
//! runtime; shrinking is LIFO so the surviving workers always hold the
//! identities `0..n`.
//!
//! Shutdown is explicit: a worker is always stopped before it is removed from
//! the sequence, and the pool never closes the channels it was given. Waiting
//! for the worker tasks themselves to exit goes through the shared
//! [`CompletionCounter`].

use super::Pool;
use crate::{
    Error, Result,
    channel::{OutputSender, SharedReceiver},
    counter::CompletionCounter,
    factory::{WorkerContext, WorkerFactory},
    worker::Worker,
};
use parking_lot::Mutex;

/// A dynamic set of workers consuming a shared input channel and publishing to
/// a shared output channel.
///
/// Every membership operation holds the pool's lock for its whole duration, so
/// concurrent `add`/`drop`/`stop` calls are applied one at a time. Dropping the
/// pool stops any workers still in it.
pub struct WorkerPool<I, O, F>
where
    F: WorkerFactory<I, O>,
{
    workers: Mutex<Vec<F::Worker>>,
    counter: CompletionCounter,
    input: SharedReceiver<I>,
    output: OutputSender<O>,
    factory: F,
}

impl<I, O, F> WorkerPool<I, O, F>
where
    F: WorkerFactory<I, O>,
{
    /// Constructs an empty pool over caller-owned channels.
    pub fn new(
        counter: CompletionCounter,
        input: SharedReceiver<I>,
        output: OutputSender<O>,
        factory: F,
    ) -> Self {
        Self {
            workers: Mutex::new(Vec::new()),
            counter,
            input,
            output,
            factory,
        }
    }

    /// Returns the completion counter shared with this pool's workers.
    pub fn counter(&self) -> &CompletionCounter {
        &self.counter
    }

    /// Identities of the live workers, oldest first.
    pub fn worker_ids(&self) -> Vec<usize> {
        self.workers.lock().iter().map(Worker::id).collect()
    }

    /// Stops every worker and waits until all of their tasks have exited.
    ///
    /// Waits on the shared counter, so workers from other pools sharing the
    /// same counter are waited for as well.
    pub async fn shutdown(&self) {
        #[cfg(feature = "tracing")]
        tracing::info!("Shutting down worker pool ({} workers)", self.num_workers());

        self.stop();
        self.counter.wait_for_zero().await;

        #[cfg(feature = "tracing")]
        tracing::info!("Worker pool shutdown complete");
    }
}

impl<I, O, F> Pool for WorkerPool<I, O, F>
where
    F: WorkerFactory<I, O>,
{
    fn add_workers_and_start(&self, count: usize) {
        let mut workers = self.workers.lock();
        let first = workers.len();
        workers.reserve(count);

        for id in first..first + count {
            let worker = self.factory.create(WorkerContext {
                id,
                counter: self.counter.clone(),
                input: self.input.clone(),
                output: self.output.clone(),
            });
            worker.start();
            workers.push(worker);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Added {count} workers ({} total)", workers.len());
    }

    fn drop_workers(&self, count: usize) -> Result<()> {
        let mut workers = self.workers.lock();
        let available = workers.len();

        if count > available {
            #[cfg(feature = "tracing")]
            tracing::warn!("Refusing to drop {count} workers from a pool of {available}");
            return Err(Error::OutOfRange {
                requested: count,
                available,
            });
        }

        let keep = available - count;
        // Newest first, and stopped while still owned by the pool.
        for worker in workers[keep..].iter().rev() {
            worker.stop();
        }
        workers.truncate(keep);

        #[cfg(feature = "tracing")]
        tracing::debug!("Dropped {count} workers ({keep} remaining)");

        Ok(())
    }

    fn stop(&self) {
        let mut workers = self.workers.lock();
        for worker in workers.iter() {
            worker.stop();
        }
        workers.clear();
    }

    fn num_workers(&self) -> usize {
        self.workers.lock().len()
    }
}

impl<I, O, F> Drop for WorkerPool<I, O, F>
where
    F: WorkerFactory<I, O>,
{
    fn drop(&mut self) {
        for worker in self.workers.get_mut().iter() {
            worker.stop();
        }
    }
}
