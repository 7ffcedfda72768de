//! # Utilities Module
//!
//! Internal utility modules for the query-core crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

pub(crate) mod executor;
pub(crate) mod logger;
pub(crate) mod transport;

// Selective exports - only public utilities
pub use executor::TokioExecutor;
pub use logger::{setup_logger, setup_logger_with_file, OUTCOME_TARGET};
pub use transport::CancellableTransport;
