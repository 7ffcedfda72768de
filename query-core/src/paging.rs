//! # Paged Fetcher
//!
//! Drains one chunk's paginated sub-query. Every page request, including the
//! first, runs as its own task on the [`TaskExecutor`], so a long cursor
//! chain never grows the stack and pages of unrelated chunks interleave.

use crate::chunk::Chunk;
use crate::completion::{completion_channel, Completion, QueryHandle};
use crate::error::QueryError;
use crate::metrics::QueryMetrics;
use crate::traits::{PageFetch, TaskExecutor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Remote page size used when the caller does not pick one.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 20;

/// Ceiling on pages drained for a single chunk.
pub const DEFAULT_MAX_PAGES_PER_CHUNK: usize = 1000;

/// Opaque continuation token. Absence on a page marks the last page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One decoded page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageCursor>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    pub fn with_next(items: Vec<T>, next: impl Into<String>) -> Self {
        Self {
            items,
            next: Some(PageCursor::new(next)),
        }
    }
}

/// Check run over a chunk's drained items before it is reported as a success.
pub type ChunkValidator<T> = Arc<dyn Fn(&[T]) -> Result<(), QueryError> + Send + Sync>;

struct Progress<T> {
    items: Vec<T>,
    pages: usize,
    cursor: Option<PageCursor>,
    /// Every cursor followed so far; a cursor chain must never revisit one.
    seen: HashSet<PageCursor>,
}

/// Follows a chunk's cursor chain to the end, accumulating every page.
///
/// Delivers `Ok(items)` once the last page arrives, or the first error from
/// any page. Pages merged before an error are discarded.
pub struct PagedFetcher<K, T, F> {
    chunk: Chunk<K>,
    fetch: Arc<F>,
    executor: Arc<dyn TaskExecutor>,
    max_pages: usize,
    validator: Option<ChunkValidator<T>>,
    metrics: Arc<QueryMetrics>,
}

impl<K, T, F> PagedFetcher<K, T, F>
where
    K: Send + Sync + 'static,
    T: Send + 'static,
    F: PageFetch<K, T> + 'static,
{
    pub fn new(chunk: Chunk<K>, fetch: Arc<F>, executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            chunk,
            fetch,
            executor,
            max_pages: DEFAULT_MAX_PAGES_PER_CHUNK,
            validator: None,
            metrics: Arc::new(QueryMetrics::default()),
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_validator(mut self, validator: Option<ChunkValidator<T>>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<QueryMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Starts draining; `completion` receives the single outcome.
    pub fn start(self, completion: Completion<Vec<T>>) {
        let progress = Progress {
            items: Vec::new(),
            pages: 0,
            cursor: None,
            seen: HashSet::new(),
        };
        Arc::new(self).submit_page(progress, completion);
    }

    /// Starts draining and returns a handle resolving to the outcome.
    pub fn fetch_all(self) -> QueryHandle<Vec<T>> {
        let (completion, handle) = completion_channel();
        self.start(completion);
        handle
    }

    fn submit_page(self: Arc<Self>, progress: Progress<T>, completion: Completion<Vec<T>>) {
        let executor = self.executor.clone();
        executor.submit(Box::pin(async move {
            let result = self
                .fetch
                .fetch(&self.chunk, progress.cursor.as_ref())
                .await;
            self.handle_page(progress, result, completion);
        }));
    }

    fn handle_page(
        self: Arc<Self>,
        mut progress: Progress<T>,
        result: Result<Page<T>, QueryError>,
        completion: Completion<Vec<T>>,
    ) {
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                debug!(
                    "Chunk {} failed on page {}: {}",
                    self.chunk.index(),
                    progress.pages + 1,
                    e
                );
                return completion(Err(e));
            }
        };

        self.metrics.record_page();
        progress.pages += 1;
        let page_was_empty = page.items.is_empty();
        progress.items.extend(page.items);

        let Some(next) = page.next else {
            debug!(
                "Chunk {} drained: {} items over {} pages",
                self.chunk.index(),
                progress.items.len(),
                progress.pages
            );
            let outcome = match &self.validator {
                Some(validate) => validate(&progress.items).map(|()| progress.items),
                None => Ok(progress.items),
            };
            return completion(outcome);
        };

        if progress.seen.contains(&next) {
            return completion(Err(QueryError::protocol(format!(
                "cursor '{}' was already followed",
                next
            ))));
        }
        if page_was_empty {
            return completion(Err(QueryError::protocol(format!(
                "empty page carried cursor '{}'",
                next
            ))));
        }
        if progress.pages >= self.max_pages {
            return completion(Err(QueryError::protocol(format!(
                "chunk exceeded {} pages",
                self.max_pages
            ))));
        }

        debug!(
            "Chunk {} page {} -> next '{}'",
            self.chunk.index(),
            progress.pages,
            next
        );
        progress.seen.insert(next.clone());
        progress.cursor = Some(next);
        self.submit_page(progress, completion);
    }
}
