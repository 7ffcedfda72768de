//! # Query Core - Request Orchestration for a Blockchain Data Service
//!
//! This crate sits between a wallet system and a remote blockchain-data
//! service. It splits address-heavy queries into bounded chunks, drains each
//! chunk's paginated sub-query, merges the results, and reports exactly one
//! success or one failure per logical query. It also waits out
//! eventually-consistent creates with a bounded periodic retry.
//!
//! ## Modules
//!
//! - [`api`] - Blockset-style queries and response decoding
//! - [`chunk`] - Key-set partitioning
//! - [`completion`] - Exactly-once terminal delivery
//! - [`config`] - Orchestrator configuration
//! - [`coordinator`] - Aggregation of concurrent chunk outcomes
//! - [`error`] - Typed error handling with thiserror
//! - [`metrics`] - Query counters
//! - [`orchestrator`] - Wiring of fetchers, coordinators and retries
//! - [`paging`] - Cursor-following page fetcher
//! - [`retry`] - Fixed-period retry scheduler
//! - [`traits`] - Consumed capabilities (transport, executor, fetch, probe)

pub mod api;
pub mod chunk;
pub mod completion;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod paging;
pub mod retry;
pub mod traits;
pub(crate) mod utils;

pub use api::{
    ApiRequest, BlocksetQueries, Capabilities, HasStatus, Method, ResourcePageFetch,
    TransactionQueryOptions,
};
pub use chunk::{partition, Chunk, DEFAULT_ADDRESS_CHUNK_SIZE};
pub use completion::{completion_channel, Completion, QueryHandle};
pub use config::{LoggingConfig, OrchestratorConfig, RetryConfig};
pub use coordinator::{ChunkCoordinator, CoordinatorPhase};
pub use error::{ConfigError, ErrorKind, QueryError, TransportError};
pub use metrics::{MetricsSnapshot, QueryMetrics};
pub use orchestrator::{BulkQuery, RequestOrchestrator};
pub use paging::{ChunkValidator, Page, PageCursor, PagedFetcher, DEFAULT_MAX_PAGE_SIZE};
pub use retry::{RetryBudget, RetryDecision, RetryPolicy, RetryScheduler, RetryState};
pub use traits::{PageFetch, Probe, Task, TaskExecutor, Transport};

// Utils are pub(crate) - only export specific public utilities
pub use utils::{
    setup_logger, setup_logger_with_file, CancellableTransport, TokioExecutor, OUTCOME_TARGET,
};
