use super::{Greeting, Transform, Worker, WorkerState};
use crate::{
    channel::{OutputSender, SharedReceiver},
    counter::{CompletionCounter, CompletionGuard},
    factory::WorkerContext,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Worker that applies a [`Transform`] to every input item and publishes the
/// result on the output channel.
///
/// Cloning the handle is not supported: a worker is owned by one pool. The
/// spawned task keeps its own reference to the shared state, so dropping the
/// handle does not stop a running worker.
pub struct TransformWorker<I, O, T> {
    shared: Arc<Shared<I, O, T>>,
}

struct Shared<I, O, T> {
    id: usize,
    state: Mutex<WorkerState>,
    stop_signal: CancellationToken,
    counter: CompletionCounter,
    input: SharedReceiver<I>,
    output: OutputSender<O>,
    transform: Arc<T>,
}

/// The default worker: tags each string with its worker identity.
pub type SimpleWorker = TransformWorker<String, String, Greeting>;

impl<I, O, T> TransformWorker<I, O, T>
where
    I: Send + 'static,
    O: Send + 'static,
    T: Transform<I, O>,
{
    pub fn new(ctx: WorkerContext<I, O>, transform: Arc<T>) -> Self {
        let WorkerContext {
            id,
            counter,
            input,
            output,
        } = ctx;

        Self {
            shared: Arc::new(Shared {
                id,
                state: Mutex::new(WorkerState::Created),
                stop_signal: CancellationToken::new(),
                counter,
                input,
                output,
                transform,
            }),
        }
    }

    /// Returns a handle to this worker's stop signal.
    ///
    /// The token is cancelled exactly once, by the first effective `stop()`.
    pub fn stop_signal(&self) -> CancellationToken {
        self.shared.stop_signal.clone()
    }
}

impl SimpleWorker {
    /// Builds a greeting worker outside of any pool.
    pub fn simple(
        id: usize,
        counter: CompletionCounter,
        input: SharedReceiver<String>,
        output: OutputSender<String>,
    ) -> Self {
        Self::new(
            WorkerContext {
                id,
                counter,
                input,
                output,
            },
            Arc::new(Greeting),
        )
    }
}

impl<I, O, T> Worker for TransformWorker<I, O, T>
where
    I: Send + 'static,
    O: Send + 'static,
    T: Transform<I, O>,
{
    fn id(&self) -> usize {
        self.shared.id
    }

    fn state(&self) -> WorkerState {
        *self.shared.state.lock()
    }

    fn start(&self) {
        {
            let mut state = self.shared.state.lock();
            if *state != WorkerState::Created {
                #[cfg(feature = "tracing")]
                tracing::trace!("Worker {} ignored start while {}", self.shared.id, *state);
                return;
            }
            *state = WorkerState::Running;
        }

        let guard = self.shared.counter.register();
        tokio::spawn(worker_loop(Arc::clone(&self.shared), guard));
    }

    fn stop(&self) {
        let mut state = self.shared.state.lock();
        if state.is_stopped() {
            return;
        }
        *state = WorkerState::Stopped;
        self.shared.stop_signal.cancel();

        #[cfg(feature = "tracing")]
        tracing::debug!("Worker {} stopped", self.shared.id);
    }
}

/// Task body of a [`TransformWorker`].
///
/// Every suspension point (waiting for input, running the transform, waiting
/// for an output slot) is raced against the stop signal, with the stop signal
/// polled first. Once a slot is reserved the record is committed under the
/// state lock, which `stop()` also takes, so nothing is published after
/// `stop()` returns.
///
/// The loop also ends when the input channel is closed and drained, or when
/// the output receiver is gone. `_guard` keeps the worker registered with the
/// completion counter until the task exits.
async fn worker_loop<I, O, T>(shared: Arc<Shared<I, O, T>>, _guard: CompletionGuard)
where
    I: Send + 'static,
    O: Send + 'static,
    T: Transform<I, O>,
{
    let worker_id = shared.id;

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    loop {
        let item = tokio::select! {
            biased;
            () = shared.stop_signal.cancelled() => break,
            item = shared.input.recv() => item,
        };

        let Some(item) = item else {
            #[cfg(feature = "tracing")]
            tracing::debug!("Worker {worker_id} exiting: input channel closed");
            break;
        };

        if shared.stop_signal.is_cancelled() {
            break;
        }

        let record = tokio::select! {
            biased;
            () = shared.stop_signal.cancelled() => break,
            record = shared.transform.apply(worker_id, item) => record,
        };

        let permit = tokio::select! {
            biased;
            () = shared.stop_signal.cancelled() => break,
            permit = shared.output.reserve() => permit,
        };

        let Ok(permit) = permit else {
            #[cfg(feature = "tracing")]
            tracing::debug!("Worker {worker_id} exiting: output channel closed");
            break;
        };

        let delivered = {
            let state = shared.state.lock();
            if state.is_stopped() {
                false
            } else {
                permit.send(record);
                true
            }
        };

        if !delivered {
            break;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} exited");
}
