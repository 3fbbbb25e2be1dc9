//! Channel types shared by every worker in a pool.
//!
//! Workers compete for items on a single input channel. tokio's mpsc receiver
//! is single-consumer, so [`SharedReceiver`] puts it behind an async mutex and
//! hands out cheap clones. Receiving stays cancel-safe: dropping a pending
//! `recv()` releases the lock without losing an item.
//!
//! Output goes through a plain cloned [`mpsc::Sender`].
//!
//! Channels belong to whoever created them. The input closes once every
//! input sender is dropped, the output once its receiver is dropped; the pool
//! never closes either one.

use core::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Sending half of a pool's output channel.
pub type OutputSender<T> = mpsc::Sender<T>;

/// Multi-consumer handle over an mpsc receiver.
pub struct SharedReceiver<T> {
    inner: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> SharedReceiver<T> {
    pub fn new(rx: mpsc::Receiver<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rx)),
        }
    }

    /// Receives the next item, waiting for other consumers to finish their own
    /// receive first.
    ///
    /// Returns `None` once the channel is closed and drained.
    pub async fn recv(&self) -> Option<T> {
        self.inner.lock().await.recv().await
    }
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> From<mpsc::Receiver<T>> for SharedReceiver<T> {
    fn from(rx: mpsc::Receiver<T>) -> Self {
        Self::new(rx)
    }
}

impl<T> fmt::Debug for SharedReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedReceiver")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}

/// Creates a bounded channel whose receiving half can be shared by a pool.
///
/// A capacity of 1 is the closest tokio gets to a rendezvous channel.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn channel<T>(capacity: usize) -> (mpsc::Sender<T>, SharedReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, SharedReceiver::new(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use std::collections::HashSet;
    use tokio::time::timeout;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn clones_split_items_between_them() {
        const ITEMS: usize = 64;
        let (tx, rx) = channel::<usize>(1);

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let rx = rx.clone();
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    while let Some(item) = rx.recv().await {
                        seen.push(item);
                    }
                    seen
                })
            })
            .collect();
        drop(rx);

        for i in 0..ITEMS {
            tx.send(i).await.unwrap();
        }
        drop(tx);

        let mut all = HashSet::new();
        for consumer in consumers {
            for item in consumer.await.unwrap() {
                assert!(all.insert(item), "item {item} delivered twice");
            }
        }
        assert_eq!(all.len(), ITEMS);
    }

    #[tokio::test]
    async fn cancelled_recv_does_not_hold_the_lock() {
        let (tx, rx) = channel::<&str>(1);
        let other = rx.clone();

        // Abandon a receive that is parked on an empty channel.
        assert!(
            timeout(Duration::from_millis(20), rx.recv())
                .await
                .is_err()
        );

        tx.send("hello").await.unwrap();
        let item = timeout(Duration::from_millis(100), other.recv())
            .await
            .expect("lock should have been released");
        assert_eq!(item, Some("hello"));
    }
}
