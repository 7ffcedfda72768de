//! # Request Orchestrator
//!
//! Wires the building blocks together: chunked + paged bulk queries, plain
//! paged queries, retrying probes and create-then-await flows.

use crate::chunk::{partition, Chunk};
use crate::completion::{completion_channel, Completion, QueryHandle};
use crate::coordinator::ChunkCoordinator;
use crate::error::QueryError;
use crate::metrics::QueryMetrics;
use crate::paging::{ChunkValidator, PagedFetcher, DEFAULT_MAX_PAGES_PER_CHUNK};
use crate::retry::{RetryPolicy, RetryScheduler};
use crate::traits::{PageFetch, Probe, TaskExecutor};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A logical query over an arbitrarily large key set.
pub struct BulkQuery<K, T, F> {
    label: String,
    keys: Vec<K>,
    chunk_size: usize,
    fetch: F,
    validator: Option<ChunkValidator<T>>,
}

impl<K, T, F> BulkQuery<K, T, F> {
    pub fn new(label: impl Into<String>, keys: Vec<K>, chunk_size: usize, fetch: F) -> Self {
        Self {
            label: label.into(),
            keys,
            chunk_size,
            fetch,
            validator: None,
        }
    }

    /// Runs `validator` over each drained chunk; a rejection fails the query.
    pub fn with_validator(
        mut self,
        validator: impl Fn(&[T]) -> Result<(), QueryError> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }
}

pub struct RequestOrchestrator {
    executor: Arc<dyn TaskExecutor>,
    metrics: Arc<QueryMetrics>,
    max_pages_per_chunk: usize,
}

impl RequestOrchestrator {
    pub fn new(executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            executor,
            metrics: Arc::new(QueryMetrics::default()),
            max_pages_per_chunk: DEFAULT_MAX_PAGES_PER_CHUNK,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<QueryMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_max_pages_per_chunk(mut self, max_pages: usize) -> Self {
        self.max_pages_per_chunk = max_pages;
        self
    }

    pub fn metrics(&self) -> &Arc<QueryMetrics> {
        &self.metrics
    }

    pub fn executor(&self) -> &Arc<dyn TaskExecutor> {
        &self.executor
    }

    fn tracked<T: Send + 'static>(&self, completion: Completion<T>) -> Completion<T> {
        let metrics = self.metrics.clone();
        metrics.record_query_started();
        Box::new(move |outcome| {
            metrics.record_query_outcome(outcome.is_ok());
            completion(outcome)
        })
    }

    /// Partitions the keys, drains one [`PagedFetcher`] per chunk and merges
    /// everything into `completion`.
    ///
    /// Fails synchronously, before any work is submitted, when the key set is
    /// empty or the chunk size is zero; `completion` is not called then.
    pub fn submit_bulk<K, T, F>(
        &self,
        query: BulkQuery<K, T, F>,
        completion: Completion<Vec<T>>,
    ) -> Result<(), QueryError>
    where
        K: Send + Sync + 'static,
        T: Send + 'static,
        F: PageFetch<K, T> + 'static,
    {
        let BulkQuery {
            label,
            keys,
            chunk_size,
            fetch,
            validator,
        } = query;

        let chunks = partition(keys, chunk_size)?;
        info!("{}: {} chunks of up to {} keys", label, chunks.len(), chunk_size);

        let coordinator = Arc::new(
            ChunkCoordinator::new(&chunks, self.tracked(completion))
                .with_label(label)
                .with_metrics(self.metrics.clone()),
        );
        let fetch = Arc::new(fetch);

        for chunk in chunks {
            let index = chunk.index();
            let coordinator = coordinator.clone();
            PagedFetcher::new(chunk, fetch.clone(), self.executor.clone())
                .with_max_pages(self.max_pages_per_chunk)
                .with_validator(validator.clone())
                .with_metrics(self.metrics.clone())
                .start(Box::new(move |outcome| match outcome {
                    Ok(items) => coordinator.chunk_completed(index, items),
                    Err(e) => coordinator.chunk_failed(index, e),
                }));
        }
        Ok(())
    }

    /// `bulkQuery(keys, chunkSize, pageFetchFn)`.
    pub fn bulk_query<K, T, F>(
        &self,
        keys: Vec<K>,
        chunk_size: usize,
        fetch: F,
    ) -> Result<QueryHandle<Vec<T>>, QueryError>
    where
        K: Send + Sync + 'static,
        T: Send + 'static,
        F: PageFetch<K, T> + 'static,
    {
        let (completion, handle) = completion_channel();
        self.submit_bulk(BulkQuery::new("bulk", keys, chunk_size, fetch), completion)?;
        Ok(handle)
    }

    /// Drains a single paginated query that needs no chunking.
    pub fn submit_paged<T, F>(&self, label: &str, fetch: F, completion: Completion<Vec<T>>)
    where
        T: Send + 'static,
        F: PageFetch<String, T> + 'static,
    {
        debug!("{}: paged query", label);
        let chunk = Chunk::<String>::whole(Vec::new());
        PagedFetcher::new(chunk, Arc::new(fetch), self.executor.clone())
            .with_max_pages(self.max_pages_per_chunk)
            .with_metrics(self.metrics.clone())
            .start(self.tracked(completion));
    }

    /// Runs `probe` under `policy`, starting after `initial_delay` if given.
    pub fn submit_retrying<T, P>(
        &self,
        label: &str,
        probe: P,
        policy: RetryPolicy,
        initial_delay: Option<Duration>,
        completion: Completion<T>,
    ) where
        T: Send + 'static,
        P: Probe<T> + 'static,
    {
        let scheduler = Arc::new(
            RetryScheduler::new(probe, policy, self.executor.clone())
                .with_label(label)
                .with_metrics(self.metrics.clone()),
        );
        let completion = self.tracked(completion);
        match initial_delay {
            Some(delay) => scheduler.start_after(delay, completion),
            None => scheduler.start(completion),
        }
    }

    /// `retryingQuery(probeFn, period, totalBudget)`.
    pub fn retrying_query<T, P>(&self, probe: P, period: Duration, total: Duration) -> QueryHandle<T>
    where
        T: Send + 'static,
        P: Probe<T> + 'static,
    {
        let (completion, handle) = completion_channel();
        self.submit_retrying(
            "retrying",
            probe,
            RetryPolicy::new(period, total),
            None,
            completion,
        );
        handle
    }

    /// Issues `create`, then waits for the created resource to become
    /// visible through `probe`.
    ///
    /// After a successful create the first probe runs after `initial_delay`
    /// and retries under `policy`. A create rejected as a submission error
    /// (the resource already exists) is followed by one immediate lookup
    /// whose outcome is delivered as is; only an empty lookup becomes
    /// [`QueryError::RetryExhausted`]. Any other create failure is delivered
    /// unchanged.
    pub fn submit_create_and_await<C, R, T, P>(
        &self,
        label: &str,
        create: C,
        probe: P,
        policy: RetryPolicy,
        initial_delay: Duration,
        completion: Completion<T>,
    ) where
        C: Future<Output = Result<R, QueryError>> + Send + 'static,
        R: Send + 'static,
        T: Send + 'static,
        P: Probe<T> + 'static,
    {
        let label = label.to_string();
        let executor = self.executor.clone();
        let metrics = self.metrics.clone();
        let completion = self.tracked(completion);

        self.executor.submit(Box::pin(async move {
            match create.await {
                Ok(_) => {
                    debug!("{}: created, first probe in {:?}", label, initial_delay);
                    Arc::new(
                        RetryScheduler::new(probe, policy, executor)
                            .with_label(label)
                            .with_metrics(metrics),
                    )
                    .start_after(initial_delay, completion);
                }
                Err(QueryError::Submission { reason }) => {
                    debug!("{}: already exists ({}), looking it up", label, reason);
                    metrics.record_retry_attempt();
                    let outcome = match probe.probe().await {
                        Ok(Some(value)) => Ok(value),
                        Ok(None) => Err(QueryError::RetryExhausted { attempts: 1 }),
                        Err(e) => Err(e),
                    };
                    match &outcome {
                        Ok(_) => info!(target: "query_outcome", "{} SUCCESS on lookup", label),
                        Err(e) => info!(target: "query_outcome", "{} FAILED on lookup: {}", label, e),
                    }
                    completion(outcome);
                }
                Err(e) => {
                    info!(target: "query_outcome", "{} FAILED to create: {}", label, e);
                    completion(Err(e));
                }
            }
        }));
    }
}
