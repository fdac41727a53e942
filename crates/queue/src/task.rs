//! Task creation and the settlable-result handle.
//!
//! A submitted callback is bundled with one side of a oneshot channel into a
//! [`Task`]; the other side is wrapped in the [`TaskHandle`] returned to the
//! submitter. Settlement is at-most-once by construction: sending on the
//! oneshot consumes the sender.

use std::error::Error;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::error::TaskError;

/// A queued unit of work.
///
/// Owns the submitted callback and the settle side of its handle. The queue
/// holds it exclusively until the run-loop pops and runs it; afterwards it is
/// dropped.
pub(crate) struct Task {
    exec: Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>,
}

impl Task {
    /// Run the callback to completion and settle the handle.
    pub(crate) async fn run(self) {
        (self.exec)().await;
    }
}

/// Handle returned at submission time.
///
/// Resolves once the task settles: `Ok` with the callback's value, or a
/// [`TaskError`] describing the failure. Dropping the handle does not cancel
/// the task; it still runs in its turn.
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|settled| match settled {
            Ok(outcome) => outcome,
            // Sender dropped without settling: the queue and its backlog went
            // away before this task ran.
            Err(_) => Err(TaskError::Dropped),
        })
    }
}

/// Bundle a callback with a fresh settlable handle.
///
/// The callback runs under a panic guard, so a panicking task settles its own
/// handle instead of killing the run-loop. A returned error and a panic are
/// both normalized to a failed settlement.
pub(crate) fn create_task<F, Fut, T, E>(callback: F) -> (Task, TaskHandle<T>)
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    let (tx, rx) = oneshot::channel();
    let exec = Box::new(move || {
        async move {
            let outcome = AssertUnwindSafe(async move { callback().await })
                .catch_unwind()
                .await;
            let settled = match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(TaskError::Failed(e.into())),
                Err(panic) => Err(TaskError::Panicked(panic_message(panic.as_ref()))),
            };
            // Send fails only if the submitter dropped the handle; the task
            // already ran, so there is nothing left to do.
            let _ = tx.send(settled);
        }
        .boxed()
    });
    (Task { exec }, TaskHandle { rx })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
