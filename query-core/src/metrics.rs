use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_ms: u64,
    pub queries: QueryCounts,
    pub chunks: ChunkCounts,
    pub retries: RetryCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryCounts {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkCounts {
    pub completed: u64,
    pub failed: u64,
    pub pages_fetched: u64,
    pub late_signals_dropped: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetryCounts {
    pub attempts: u64,
    pub exhausted: u64,
}

/// Counters for orchestrated queries. Cheap to update from any worker.
#[derive(Debug)]
pub struct QueryMetrics {
    queries_started: AtomicU64,
    queries_succeeded: AtomicU64,
    queries_failed: AtomicU64,
    chunks_completed: AtomicU64,
    chunks_failed: AtomicU64,
    pages_fetched: AtomicU64,
    late_signals_dropped: AtomicU64,
    retry_attempts: AtomicU64,
    retries_exhausted: AtomicU64,
    start_time: Instant,
}

impl Default for QueryMetrics {
    fn default() -> Self {
        Self {
            queries_started: AtomicU64::new(0),
            queries_succeeded: AtomicU64::new(0),
            queries_failed: AtomicU64::new(0),
            chunks_completed: AtomicU64::new(0),
            chunks_failed: AtomicU64::new(0),
            pages_fetched: AtomicU64::new(0),
            late_signals_dropped: AtomicU64::new(0),
            retry_attempts: AtomicU64::new(0),
            retries_exhausted: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl QueryMetrics {
    pub fn record_query_started(&self) {
        self.queries_started.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_query_outcome(&self, success: bool) {
        if success {
            self.queries_succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.queries_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn record_chunk(&self, success: bool) {
        if success {
            self.chunks_completed.fetch_add(1, Ordering::SeqCst);
        } else {
            self.chunks_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn record_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_late_signal(&self) {
        self.late_signals_dropped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_retry_attempt(&self) {
        self.retry_attempts.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_retry_exhausted(&self) {
        self.retries_exhausted.fetch_add(1, Ordering::SeqCst);
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched.load(Ordering::SeqCst)
    }

    pub fn late_signals_dropped(&self) -> u64 {
        self.late_signals_dropped.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let started = self.queries_started.load(Ordering::SeqCst);
        let succeeded = self.queries_succeeded.load(Ordering::SeqCst);
        let failed = self.queries_failed.load(Ordering::SeqCst);
        let finished = succeeded + failed;

        MetricsSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            uptime_ms: self.uptime().as_millis() as u64,
            queries: QueryCounts {
                started,
                succeeded,
                failed,
                success_rate: if finished > 0 {
                    succeeded as f64 / finished as f64 * 100.0
                } else {
                    0.0
                },
            },
            chunks: ChunkCounts {
                completed: self.chunks_completed.load(Ordering::SeqCst),
                failed: self.chunks_failed.load(Ordering::SeqCst),
                pages_fetched: self.pages_fetched(),
                late_signals_dropped: self.late_signals_dropped(),
            },
            retries: RetryCounts {
                attempts: self.retry_attempts.load(Ordering::SeqCst),
                exhausted: self.retries_exhausted.load(Ordering::SeqCst),
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}
