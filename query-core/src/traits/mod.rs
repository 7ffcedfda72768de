//! Capabilities this crate consumes. Implementations are supplied by the
//! embedding wallet system (or by tests).

use crate::api::ApiRequest;
use crate::chunk::Chunk;
use crate::error::{QueryError, TransportError};
use crate::paging::{Page, PageCursor};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A unit of work handed to a [`TaskExecutor`].
pub type Task = BoxFuture<'static, ()>;

/// Unordered work submission plus one-shot delayed execution.
pub trait TaskExecutor: Send + Sync {
    /// Run `task` on the worker pool. Returns immediately.
    fn submit(&self, task: Task);

    /// Run `task` once after `delay`.
    fn schedule(&self, task: Task, delay: Duration);
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one request and resolve to the raw response body.
    async fn send(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError> {
        self.as_ref().send(request).await
    }
}

/// Fetches one page of a chunk's sub-query.
#[async_trait]
pub trait PageFetch<K, T>: Send + Sync
where
    K: Send + Sync,
{
    /// `cursor` is `None` for the first page.
    async fn fetch(
        &self,
        chunk: &Chunk<K>,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<T>, QueryError>;
}

/// One look at an eventually-consistent resource. `Ok(None)` means the
/// resource is not visible yet.
#[async_trait]
pub trait Probe<T>: Send + Sync {
    async fn probe(&self) -> Result<Option<T>, QueryError>;
}

#[async_trait]
impl<T, F, Fut> Probe<T> for F
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<T>, QueryError>> + Send,
{
    async fn probe(&self) -> Result<Option<T>, QueryError> {
        (self)().await
    }
}
