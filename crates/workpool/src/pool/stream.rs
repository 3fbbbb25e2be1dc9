//! Pool that forwards its output to a line-oriented writer.
//!
//! [`StreamWorkerPool`] wraps a [`WorkerPool`] whose output channel it owns.
//! A listener task drains that channel and writes each record, followed by a
//! newline, to an [`AsyncWrite`]. Delivery to the writer is at-most-once: a
//! record in flight when the pool shuts down may be discarded.
//!
//! [`Pool::stop`] only stops the workers. The listener keeps running, so the
//! pool can be grown again afterwards; it ends on [`shutdown`] or [`drain`].
//!
//! [`shutdown`]: StreamWorkerPool::shutdown
//! [`drain`]: StreamWorkerPool::drain

use super::{Pool, WorkerPool};
use crate::{
    Result,
    channel::SharedReceiver,
    counter::CompletionCounter,
    factory::WorkerFactory,
};
use core::fmt;
use std::io;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

/// A [`WorkerPool`] whose records are written line by line to `W`.
pub struct StreamWorkerPool<I, O, F, W>
where
    F: WorkerFactory<I, O>,
{
    pool: WorkerPool<I, O, F>,
    stop_signal: CancellationToken,
    listener: JoinHandle<io::Result<W>>,
}

impl<I, O, F, W> StreamWorkerPool<I, O, F, W>
where
    O: fmt::Display + Send + 'static,
    F: WorkerFactory<I, O>,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Creates the pool and spawns its output listener.
    ///
    /// `output_capacity` bounds the private channel between workers and the
    /// listener.
    ///
    /// # Panics
    ///
    /// Panics outside a tokio runtime, or if `output_capacity` is zero.
    pub fn new(
        counter: CompletionCounter,
        input: SharedReceiver<I>,
        factory: F,
        writer: W,
        output_capacity: usize,
    ) -> Self {
        let (output_tx, output_rx) = mpsc::channel(output_capacity);
        let stop_signal = CancellationToken::new();
        let listener = tokio::spawn(listen(output_rx, writer, stop_signal.clone()));

        Self {
            pool: WorkerPool::new(counter, input, output_tx, factory),
            stop_signal,
            listener,
        }
    }

    /// Returns the completion counter shared with this pool's workers.
    pub fn counter(&self) -> &CompletionCounter {
        self.pool.counter()
    }

    /// Stops the workers and the listener, waits for every worker task to
    /// exit, and hands back the writer.
    ///
    /// Records still queued for the listener are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Sink`](crate::Error::Sink) if a write failed earlier,
    /// or [`Error::ListenerJoin`](crate::Error::ListenerJoin) if the listener
    /// task panicked.
    pub async fn shutdown(self) -> Result<W> {
        self.pool.shutdown().await;
        self.stop_signal.cancel();
        Ok(self.listener.await??)
    }

    /// Lets the workers finish every queued input item, writes every record
    /// they produce, and hands back the writer.
    ///
    /// The workers only finish once the input channel is closed, so every
    /// input sender must have been dropped for this to resolve.
    ///
    /// # Errors
    ///
    /// Same as [`shutdown`](Self::shutdown).
    pub async fn drain(self) -> Result<W> {
        self.pool.counter().wait_for_zero().await;

        #[cfg(feature = "tracing")]
        tracing::debug!("Workers idle, flushing remaining output");

        // Dropping the pool releases the last output sender, which lets the
        // listener run to the end of the channel.
        drop(self.pool);
        Ok(self.listener.await??)
    }
}

impl<I, O, F, W> Pool for StreamWorkerPool<I, O, F, W>
where
    F: WorkerFactory<I, O>,
{
    fn add_workers_and_start(&self, count: usize) {
        self.pool.add_workers_and_start(count);
    }

    fn drop_workers(&self, count: usize) -> Result<()> {
        self.pool.drop_workers(count)
    }

    fn stop(&self) {
        // Records committed before the stop are still written.
        self.pool.stop();
    }

    fn num_workers(&self) -> usize {
        self.pool.num_workers()
    }
}

async fn listen<O, W>(
    mut rx: mpsc::Receiver<O>,
    mut writer: W,
    stop_signal: CancellationToken,
) -> io::Result<W>
where
    O: fmt::Display,
    W: AsyncWrite + Unpin,
{
    loop {
        let record = tokio::select! {
            biased;
            () = stop_signal.cancelled() => break,
            record = rx.recv() => record,
        };

        let Some(record) = record else {
            break;
        };

        let line = format!("{record}\n");
        tokio::select! {
            biased;
            () = stop_signal.cancelled() => break,
            res = write_line(&mut writer, line.as_bytes()) => {
                if let Err(e) = res {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Output sink failed: {e}");
                    return Err(e);
                }
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Output listener stopped");

    Ok(writer)
}

async fn write_line<W>(writer: &mut W, line: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, channel, simple_worker_factory};
    use core::time::Duration;
    use portable_atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::{
        io::{AsyncBufReadExt, BufReader},
        time::timeout,
    };

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn writes_one_line_per_record() {
        let (in_tx, in_rx) = channel::<String>(1);
        let (writer, reader) = tokio::io::duplex(4096);
        let pool = StreamWorkerPool::new(
            CompletionCounter::new(),
            in_rx,
            simple_worker_factory(),
            writer,
            1,
        );
        pool.add_workers_and_start(2);

        for i in 0..5 {
            in_tx.send(format!("line {i}")).await.unwrap();
        }

        let mut lines = BufReader::new(reader).lines();
        for _ in 0..5 {
            let line = timeout(Duration::from_secs(2), lines.next_line())
                .await
                .expect("record should be written")
                .unwrap()
                .unwrap();
            assert!(line.starts_with("Message from Worker [id:"), "{line}");
        }

        let _writer = pool.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn drain_writes_everything_queued() {
        const ITEMS: usize = 32;
        let (in_tx, in_rx) = channel::<String>(ITEMS);
        let pool = StreamWorkerPool::new(
            CompletionCounter::new(),
            in_rx,
            simple_worker_factory(),
            Vec::new(),
            4,
        );
        pool.add_workers_and_start(3);

        for i in 0..ITEMS {
            in_tx.send(i.to_string()).await.unwrap();
        }
        drop(in_tx);

        let written = timeout(Duration::from_secs(2), pool.drain())
            .await
            .expect("drain should finish once input is closed")
            .unwrap();
        let text = String::from_utf8(written).unwrap();
        assert_eq!(text.lines().count(), ITEMS);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let (_in_tx, in_rx) = channel::<String>(1);
        let pool = StreamWorkerPool::new(
            CompletionCounter::new(),
            in_rx,
            simple_worker_factory(),
            Vec::new(),
            1,
        );
        pool.add_workers_and_start(3);
        pool.stop();
        pool.stop();
        assert_eq!(pool.num_workers(), 0);

        let written = pool.shutdown().await.unwrap();
        assert!(written.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stopped_pool_can_grow_again() {
        let (in_tx, in_rx) = channel::<String>(8);
        let (writer, reader) = tokio::io::duplex(4096);
        let pool = StreamWorkerPool::new(
            CompletionCounter::new(),
            in_rx,
            simple_worker_factory(),
            writer,
            1,
        );
        pool.add_workers_and_start(1);
        pool.stop();
        timeout(Duration::from_secs(2), pool.counter().wait_for_zero())
            .await
            .expect("stopped worker should exit");

        pool.add_workers_and_start(1);
        for i in 0..3 {
            in_tx.send(format!("again {i}")).await.unwrap();
        }

        let mut lines = BufReader::new(reader).lines();
        for i in 0..3 {
            let line = timeout(Duration::from_secs(2), lines.next_line())
                .await
                .expect("re-added worker should be heard")
                .unwrap()
                .unwrap();
            assert_eq!(line, format!("Message from Worker [id:0]: \"again {i}\""));
        }
        assert_eq!(pool.counter().running(), 1);

        let _writer = pool.shutdown().await.unwrap();
    }

    /// Counts the lines it is asked to write and discards them.
    #[derive(Clone, Default)]
    struct LineCounter(Arc<AtomicUsize>);

    impl LineCounter {
        fn lines(&self) -> usize {
            self.0.load(Ordering::Acquire)
        }
    }

    impl AsyncWrite for LineCounter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let lines = buf.iter().filter(|&&b| b == b'\n').count();
            self.0.fetch_add(lines, Ordering::AcqRel);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stop_silences_pool_while_input_flows() {
        const OUTPUT_CAPACITY: usize = 1;
        let (in_tx, in_rx) = channel::<String>(1);
        let sink = LineCounter::default();
        let pool = StreamWorkerPool::new(
            CompletionCounter::new(),
            in_rx,
            simple_worker_factory(),
            sink.clone(),
            OUTPUT_CAPACITY,
        );
        pool.add_workers_and_start(3);

        let producer = tokio::spawn(async move {
            let mut i = 0_u64;
            while in_tx.send(i.to_string()).await.is_ok() {
                i += 1;
            }
        });

        timeout(Duration::from_secs(2), async {
            while sink.lines() < 100 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("pool should be writing");

        pool.stop();
        let at_stop = sink.lines();
        timeout(Duration::from_secs(2), pool.counter().wait_for_zero())
            .await
            .expect("stopped workers should exit");

        // Only records already committed to the output channel may follow.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let settled = sink.lines();
        assert!(
            settled - at_stop <= OUTPUT_CAPACITY + 1,
            "{} lines written after stop",
            settled - at_stop
        );

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(sink.lines(), settled, "pool kept writing after stop");
        assert!(!producer.is_finished(), "input should still be accepted");

        producer.abort();
        pool.shutdown().await.unwrap();
    }

    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn sink_failure_surfaces_on_shutdown() {
        let (in_tx, in_rx) = channel::<String>(1);
        let pool = StreamWorkerPool::new(
            CompletionCounter::new(),
            in_rx,
            simple_worker_factory(),
            BrokenPipe,
            1,
        );
        pool.add_workers_and_start(1);
        in_tx.send("Hello world".into()).await.unwrap();

        // Wait for the listener to hit the broken writer.
        timeout(Duration::from_secs(2), async {
            while !pool.listener.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("listener should fail on first write");

        let err = pool.shutdown().await.err().expect("write error expected");
        match err {
            Error::Sink(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {other}"),
        }
    }
}
