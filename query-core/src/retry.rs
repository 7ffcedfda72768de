//! # Retry Scheduler
//!
//! Repeats a probe against an eventually-consistent resource on a fixed
//! period until it yields data or the attempt budget runs out.
//!
//! A failed probe counts the same as an empty one: the write that created
//! the resource already succeeded, so both mean "not visible yet".

use crate::completion::{completion_channel, Completion, QueryHandle};
use crate::error::QueryError;
use crate::metrics::QueryMetrics;
use crate::traits::{Probe, Task, TaskExecutor};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed-period retry allowance, expressed as a period and a total duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub period: Duration,
    pub total: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(5),
            total: Duration::from_secs(4 * 60),
        }
    }
}

impl RetryPolicy {
    pub fn new(period: Duration, total: Duration) -> Self {
        Self { period, total }
    }

    /// Policy allowing exactly one attempt.
    pub fn single_attempt() -> Self {
        Self {
            period: Duration::from_secs(1),
            total: Duration::from_secs(1),
        }
    }

    /// Number of probes the policy allows: `floor(total / period)`, at least one.
    pub fn attempts(&self) -> u32 {
        if self.period.is_zero() {
            return 1;
        }
        let attempts = self.total.as_nanos() / self.period.as_nanos();
        attempts.clamp(1, u32::MAX as u128) as u32
    }

    pub fn budget(&self) -> RetryBudget {
        RetryBudget {
            attempts_remaining: self.attempts() - 1,
            attempts_made: 0,
            period: self.period,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Remaining retries for one retry loop.
///
/// The count is fixed up front; scheduling latency may stretch wall-clock
/// time past the nominal total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    attempts_remaining: u32,
    attempts_made: u32,
    period: Duration,
}

impl RetryBudget {
    pub fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    fn record_attempt(&mut self) {
        self.attempts_made += 1;
    }

    /// Consumes one retry if any are left.
    pub fn on_unproductive(&mut self) -> RetryDecision {
        if self.attempts_remaining == 0 {
            RetryDecision::GiveUp
        } else {
            self.attempts_remaining -= 1;
            RetryDecision::RetryAfter(self.period)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting,
    Succeeded,
    GivenUp,
}

/// Drives a [`Probe`] under a [`RetryPolicy`]; delivers exactly one outcome.
pub struct RetryScheduler<T, P> {
    label: String,
    probe: P,
    policy: RetryPolicy,
    executor: Arc<dyn TaskExecutor>,
    state: Mutex<RetryState>,
    metrics: Arc<QueryMetrics>,
    _output: PhantomData<fn() -> T>,
}

impl<T, P> RetryScheduler<T, P>
where
    T: Send + 'static,
    P: Probe<T> + 'static,
{
    pub fn new(probe: P, policy: RetryPolicy, executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            label: "probe".to_string(),
            probe,
            policy,
            executor,
            state: Mutex::new(RetryState::Attempting),
            metrics: Arc::new(QueryMetrics::default()),
            _output: PhantomData,
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

    pub fn state(&self) -> RetryState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: RetryState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Submits the first probe immediately.
    pub fn start(self: Arc<Self>, completion: Completion<T>) {
        let budget = self.policy.budget();
        let executor = self.executor.clone();
        executor.submit(self.attempt(budget, completion));
    }

    /// Schedules the first probe after `delay`.
    pub fn start_after(self: Arc<Self>, delay: Duration, completion: Completion<T>) {
        let budget = self.policy.budget();
        let executor = self.executor.clone();
        executor.schedule(self.attempt(budget, completion), delay);
    }

    pub fn run(self: Arc<Self>) -> QueryHandle<T> {
        let (completion, handle) = completion_channel();
        self.start(completion);
        handle
    }

    fn attempt(self: Arc<Self>, mut budget: RetryBudget, completion: Completion<T>) -> Task {
        Box::pin(async move {
            budget.record_attempt();
            self.metrics.record_retry_attempt();
            let result = self.probe.probe().await;
            self.handle_result(result, budget, completion);
        })
    }

    fn handle_result(
        self: Arc<Self>,
        result: Result<Option<T>, QueryError>,
        mut budget: RetryBudget,
        completion: Completion<T>,
    ) {
        match result {
            Ok(Some(value)) => {
                self.set_state(RetryState::Succeeded);
                info!(
                    target: "query_outcome",
                    "{} SUCCESS after {} attempts",
                    self.label,
                    budget.attempts_made()
                );
                completion(Ok(value));
            }
            unproductive => {
                match &unproductive {
                    Err(e) => debug!(
                        "{} attempt {} failed, treating as not visible: {}",
                        self.label,
                        budget.attempts_made(),
                        e
                    ),
                    _ => debug!(
                        "{} attempt {} found no data",
                        self.label,
                        budget.attempts_made()
                    ),
                }

                match budget.on_unproductive() {
                    RetryDecision::GiveUp => {
                        self.set_state(RetryState::GivenUp);
                        self.metrics.record_retry_exhausted();
                        warn!(
                            target: "query_outcome",
                            "{} FAILED: no data after {} attempts",
                            self.label,
                            budget.attempts_made()
                        );
                        completion(Err(QueryError::RetryExhausted {
                            attempts: budget.attempts_made(),
                        }));
                    }
                    RetryDecision::RetryAfter(delay) => {
                        let executor = self.executor.clone();
                        executor.schedule(self.attempt(budget, completion), delay);
                    }
                }
            }
        }
    }
}
