#![allow(dead_code)]

use async_trait::async_trait;
use query_core::{
    ApiRequest, Chunk, Page, PageCursor, PageFetch, QueryError, Task, TaskExecutor, TokioExecutor,
    Transport, TransportError,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Tokio-backed executor that counts what it is handed.
pub struct CountingExecutor {
    inner: TokioExecutor,
    pub submitted: AtomicUsize,
    pub scheduled: AtomicUsize,
}

impl CountingExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: TokioExecutor::current().unwrap(),
            submitted: AtomicUsize::new(0),
            scheduled: AtomicUsize::new(0),
        })
    }

    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    pub fn scheduled(&self) -> usize {
        self.scheduled.load(Ordering::SeqCst)
    }
}

impl TaskExecutor for CountingExecutor {
    fn submit(&self, task: Task) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        self.inner.submit(task);
    }

    fn schedule(&self, task: Task, delay: Duration) {
        self.scheduled.fetch_add(1, Ordering::SeqCst);
        self.inner.schedule(task, delay);
    }
}

/// Serves a fixed sequence of pages per chunk index and records every call.
#[derive(Default)]
pub struct ScriptedPages {
    scripts: Mutex<HashMap<usize, VecDeque<Result<Page<u32>, QueryError>>>>,
    pub calls: Mutex<Vec<(usize, Option<PageCursor>)>>,
}

impl ScriptedPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, chunk: usize, pages: Vec<Result<Page<u32>, QueryError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(chunk, pages.into_iter().collect());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PageFetch<u32, u32> for ScriptedPages {
    async fn fetch(
        &self,
        chunk: &Chunk<u32>,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<u32>, QueryError> {
        self.calls
            .lock()
            .unwrap()
            .push((chunk.index(), cursor.cloned()));
        // Let other chunks interleave.
        tokio::task::yield_now().await;
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&chunk.index())
            .and_then(VecDeque::pop_front);
        // Chunks without a script echo their keys as one page.
        next.unwrap_or_else(|| Ok(Page::last(chunk.keys().to_vec())))
    }
}

/// Transport answering from a queue of canned bodies; records requests.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<Result<String, TransportError>>>,
    pub requests: Mutex<Vec<ApiRequest>>,
    /// When set, requests with no canned response never resolve.
    pub hang_when_empty: bool,
}

impl FakeTransport {
    pub fn new(responses: Vec<Result<String, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            hang_when_empty: false,
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang_when_empty: true,
            ..Self::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError> {
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => response.map(String::into_bytes),
            None if self.hang_when_empty => std::future::pending().await,
            None => Err(TransportError::Io {
                msg: "no canned response".to_string(),
            }),
        }
    }
}
