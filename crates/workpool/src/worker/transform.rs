use core::fmt;
use core::future::ready;

/// The per-item work a [`TransformWorker`](crate::TransformWorker) performs.
///
/// The returned future is raced against the worker's stop signal, so a slow
/// transform never delays shutdown. Any `Fn(usize, I) -> impl Future<Output =
/// O>` closure is a transform; the first argument is the worker's identity.
pub trait Transform<I, O>: Send + Sync + 'static {
    fn apply(&self, worker_id: usize, item: I) -> impl Future<Output = O> + Send;
}

impl<I, O, F, Fut> Transform<I, O> for F
where
    F: Fn(usize, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send,
{
    fn apply(&self, worker_id: usize, item: I) -> impl Future<Output = O> + Send {
        self(worker_id, item)
    }
}

/// Tags each item with the identity of the worker that handled it.
///
/// ```
/// use workpool::{Greeting, Transform};
///
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// let record = rt.block_on(Greeting.apply(3, "Hello world"));
/// assert_eq!(record, r#"Message from Worker [id:3]: "Hello world""#);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Greeting;

impl<T> Transform<T, String> for Greeting
where
    T: fmt::Display,
{
    fn apply(&self, worker_id: usize, item: T) -> impl Future<Output = String> + Send {
        ready(format!("Message from Worker [id:{worker_id}]: \"{item}\""))
    }
}
