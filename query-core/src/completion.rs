//! Exactly-once terminal delivery.

use crate::error::QueryError;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Receives the terminal outcome of a logical query. Being `FnOnce`, it can
/// be invoked at most once.
pub type Completion<T> = Box<dyn FnOnce(Result<T, QueryError>) + Send + 'static>;

/// Future side of a [`completion_channel`].
#[derive(Debug)]
pub struct QueryHandle<T> {
    rx: oneshot::Receiver<Result<T, QueryError>>,
}

impl<T> Future for QueryHandle<T> {
    type Output = Result<T, QueryError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // Sender dropped without delivering.
            Poll::Ready(Err(_)) => Poll::Ready(Err(QueryError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Pairs a [`Completion`] with a [`QueryHandle`] that resolves to whatever
/// the completion is called with.
pub fn completion_channel<T: Send + 'static>() -> (Completion<T>, QueryHandle<T>) {
    let (tx, rx) = oneshot::channel();
    let completion: Completion<T> = Box::new(move |outcome| {
        // The caller may have stopped waiting; nothing to do then.
        let _ = tx.send(outcome);
    });
    (completion, QueryHandle { rx })
}
