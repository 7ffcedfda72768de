//! # Chunk Coordinator
//!
//! Folds the outcomes of many concurrently running chunk fetches into one
//! terminal outcome for the logical query.
//!
//! State transitions are detected while holding the per-instance lock; the
//! completion is invoked only after the lock is released, so a completion
//! that re-enters the coordinator cannot deadlock.

use crate::chunk::Chunk;
use crate::completion::Completion;
use crate::error::QueryError;
use crate::metrics::QueryMetrics;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorPhase {
    Pending,
    Succeeded,
    Failed,
}

struct CoordinatorState<T> {
    phase: CoordinatorPhase,
    pending: BTreeSet<usize>,
    results: Vec<T>,
    completion: Option<Completion<Vec<T>>>,
}

/// Aggregates chunk results; delivers exactly one success or one failure.
///
/// The first error wins. Anything reported after the coordinator has
/// reached a terminal phase is dropped.
pub struct ChunkCoordinator<T> {
    label: String,
    state: Mutex<CoordinatorState<T>>,
    metrics: Arc<QueryMetrics>,
}

impl<T: Send + 'static> ChunkCoordinator<T> {
    pub fn new<K>(chunks: &[Chunk<K>], completion: Completion<Vec<T>>) -> Self {
        Self {
            label: "query".to_string(),
            state: Mutex::new(CoordinatorState {
                phase: CoordinatorPhase::Pending,
                pending: chunks.iter().map(Chunk::index).collect(),
                results: Vec::new(),
                completion: Some(completion),
            }),
            metrics: Arc::new(QueryMetrics::default()),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<QueryMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState<T>> {
        // Completions run outside the lock; a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn phase(&self) -> CoordinatorPhase {
        self.lock().phase
    }

    pub fn pending_chunks(&self) -> usize {
        self.lock().pending.len()
    }

    /// Records the fully drained `items` of chunk `index`.
    pub fn chunk_completed(&self, index: usize, items: Vec<T>) {
        let delivery = {
            let mut state = self.lock();
            match state.phase {
                CoordinatorPhase::Succeeded => {
                    warn!(
                        "{}: chunk {} completed after the query already succeeded",
                        self.label, index
                    );
                    self.metrics.record_late_signal();
                    None
                }
                CoordinatorPhase::Failed => {
                    debug!("{}: dropping chunk {} result, query failed", self.label, index);
                    self.metrics.record_late_signal();
                    None
                }
                CoordinatorPhase::Pending => {
                    if state.pending.remove(&index) {
                        self.metrics.record_chunk(true);
                        state.results.extend(items);
                        debug!(
                            "{}: chunk {} done, {} pending",
                            self.label,
                            index,
                            state.pending.len()
                        );
                        if state.pending.is_empty() {
                            state.phase = CoordinatorPhase::Succeeded;
                            let results = std::mem::take(&mut state.results);
                            state.completion.take().map(|c| (c, results))
                        } else {
                            None
                        }
                    } else {
                        warn!("{}: ignoring repeated or unknown chunk {}", self.label, index);
                        self.metrics.record_late_signal();
                        None
                    }
                }
            }
        };

        if let Some((completion, results)) = delivery {
            info!(
                target: "query_outcome",
                "{} SUCCESS: {} items merged",
                self.label,
                results.len()
            );
            completion(Ok(results));
        }
    }

    /// Records that chunk `index` failed with `error`.
    pub fn chunk_failed(&self, index: usize, error: QueryError) {
        let delivery = {
            let mut state = self.lock();
            match state.phase {
                CoordinatorPhase::Succeeded => {
                    warn!(
                        "{}: chunk {} failed after the query already succeeded: {}",
                        self.label, index, error
                    );
                    self.metrics.record_late_signal();
                    None
                }
                CoordinatorPhase::Failed => {
                    debug!("{}: dropping chunk {} error: {}", self.label, index, error);
                    self.metrics.record_late_signal();
                    None
                }
                CoordinatorPhase::Pending => {
                    self.metrics.record_chunk(false);
                    state.phase = CoordinatorPhase::Failed;
                    state.results.clear();
                    state.completion.take()
                }
            }
        };

        if let Some(completion) = delivery {
            info!(
                target: "query_outcome",
                "{} FAILED on chunk {}: {}",
                self.label,
                index,
                error
            );
            completion(Err(error));
        }
    }
}
