//! The two ways the demo feeds its pool.
//!
//! Both modes write records to stdout through a [`StreamWorkerPool`] and keep
//! their own logging on stderr.

use super::config::DemoConfig;
use anyhow::{Context, bail};
use core::time::Duration;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    signal,
    sync::mpsc,
};
use tokio_stream::{StreamExt, wrappers::LinesStream};
use workpool::{
    CompletionCounter, Pool, Result as PoolResult, StreamWorkerPool, channel, simple_worker_factory,
};

const GREETING: &str = "Hello world";

/// Grows the pool, shrinks it to a single worker, and sends a batch of
/// greetings after every membership change. Finishes by closing the input
/// and draining everything that was queued.
pub async fn run_scripted(config: &DemoConfig) -> anyhow::Result<()> {
    let (input, input_rx) = channel::<String>(config.channel_capacity);
    let pool = StreamWorkerPool::new(
        CompletionCounter::new(),
        input_rx,
        simple_worker_factory(),
        tokio::io::stdout(),
        config.channel_capacity,
    );

    tracing::info!("Adding {} workers", config.num_workers);
    pool.add_workers_and_start(config.num_workers);
    send_batch(&input, config.messages).await?;

    tracing::info!("Adding 2 workers");
    pool.add_workers_and_start(2);
    send_batch(&input, config.messages).await?;

    let surplus = pool.num_workers() - 1;
    tracing::info!("Dropping {surplus} workers");
    pool.drop_workers(surplus)?;
    send_batch(&input, config.messages).await?;

    drop(input);
    finish(pool.drain(), config.shutdown_timeout).await
}

/// Forwards stdin lines to the pool until EOF or a shutdown signal.
///
/// EOF drains every queued line before returning. A signal stops the
/// workers right away and discards whatever is still in flight.
pub async fn run_stdin(config: &DemoConfig) -> anyhow::Result<()> {
    let (input, input_rx) = channel::<String>(config.channel_capacity);
    let pool = StreamWorkerPool::new(
        CompletionCounter::new(),
        input_rx,
        simple_worker_factory(),
        tokio::io::stdout(),
        config.channel_capacity,
    );
    pool.add_workers_and_start(config.num_workers);

    let feed = async move {
        let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
        while let Some(line) = lines.next().await {
            let line = line.context("failed to read stdin")?;
            if input.send(line).await.is_err() {
                break;
            }
        }
        tracing::debug!("Reached end of stdin");
        anyhow::Ok(())
    };

    let interrupted = tokio::select! {
        res = feed => {
            res?;
            false
        }
        () = shutdown_signal() => true,
    };

    if interrupted {
        finish(pool.shutdown(), config.shutdown_timeout).await
    } else {
        finish(pool.drain(), config.shutdown_timeout).await
    }
}

async fn send_batch(input: &mpsc::Sender<String>, messages: usize) -> anyhow::Result<()> {
    for _ in 0..messages {
        input
            .send(GREETING.to_owned())
            .await
            .context("input channel closed")?;
    }
    Ok(())
}

async fn finish<W>(
    teardown: impl Future<Output = PoolResult<W>>,
    limit: Duration,
) -> anyhow::Result<()> {
    match tokio::time::timeout(limit, teardown).await {
        Ok(res) => {
            res?;
            tracing::info!("Pool shut down successfully");
            Ok(())
        }
        Err(_) => bail!("pool did not shut down within {}s", limit.as_secs()),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, stopping workers...");
}
