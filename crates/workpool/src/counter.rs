//! Shared count of running worker tasks.
//!
//! A [`CompletionCounter`] is owned by a pool and handed to each worker it
//! creates. A worker registers itself right before its task is spawned and
//! holds the returned [`CompletionGuard`] for the lifetime of that task, so
//! the count drops back when the task exits for any reason, including a panic.
//! Anyone holding a clone can wait for the count to reach zero.

use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    running: AtomicUsize,
    idle: Notify,
}

/// Cloneable handle to a shared count of running workers.
#[derive(Clone, Debug, Default)]
pub struct CompletionCounter {
    inner: Arc<Inner>,
}

impl CompletionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of workers whose task has been spawned and has not yet exited.
    pub fn running(&self) -> usize {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Records one more running worker. The registration is released when the
    /// returned guard is dropped.
    pub fn register(&self) -> CompletionGuard {
        self.inner.running.fetch_add(1, Ordering::AcqRel);
        CompletionGuard {
            counter: self.clone(),
        }
    }

    /// Resolves once no registered worker is running.
    ///
    /// Returns immediately if the count is already zero. Workers registered
    /// while waiting extend the wait.
    pub async fn wait_for_zero(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register interest before reading the count so a release landing
            // in between is not missed.
            notified.as_mut().enable();

            if self.running() == 0 {
                return;
            }

            notified.await;
        }
    }

    fn release(&self) {
        if self.inner.running.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

/// Keeps one worker registered with a [`CompletionCounter`] until dropped.
#[must_use = "dropping the guard immediately releases the registration"]
#[derive(Debug)]
pub struct CompletionGuard {
    counter: CompletionCounter,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.counter.release();
    }
}
