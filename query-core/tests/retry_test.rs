mod common;

use common::CountingExecutor;
use query_core::{
    QueryError, RequestOrchestrator, RetryPolicy, RetryScheduler, RetryState, TransportError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Probe yielding nothing for the first `empty_attempts` calls.
fn visible_after(
    empty_attempts: usize,
    calls: Arc<AtomicUsize>,
) -> impl Fn() -> futures::future::Ready<Result<Option<String>, QueryError>> + Send + Sync {
    move || {
        let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
        futures::future::ready(Ok((call > empty_attempts).then(|| format!("account-{call}"))))
    }
}

#[tokio::test(start_paused = true)]
async fn test_succeeds_on_fourth_attempt() {
    let executor = CountingExecutor::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let orchestrator = RequestOrchestrator::new(executor.clone());

    let start = Instant::now();
    let outcome = orchestrator
        .retrying_query(
            visible_after(3, calls.clone()),
            Duration::from_secs(5),
            Duration::from_secs(20),
        )
        .await;
    let elapsed = start.elapsed();

    assert_eq!(outcome, Ok("account-4".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(elapsed >= Duration::from_secs(15));
    assert!(elapsed < Duration::from_secs(25));
    assert_eq!(executor.scheduled(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_stops_probing() {
    let executor = CountingExecutor::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let policy = RetryPolicy::new(Duration::from_secs(5), Duration::from_secs(20));
    let scheduler = Arc::new(RetryScheduler::new(
        visible_after(usize::MAX, calls.clone()),
        policy,
        executor.clone(),
    ));

    let outcome = scheduler.clone().run().await;

    assert_eq!(outcome, Err(QueryError::RetryExhausted { attempts: 4 }));
    assert_eq!(scheduler.state(), RetryState::GivenUp);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(executor.scheduled(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_probe_failures_are_retried() {
    let executor = CountingExecutor::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let probe = move || {
        let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
        futures::future::ready(if call < 3 {
            Err(QueryError::Transport(TransportError::Http {
                status_code: 503,
                endpoint: "accounts".to_string(),
            }))
        } else {
            Ok(Some(call))
        })
    };
    let scheduler = Arc::new(RetryScheduler::new(
        probe,
        RetryPolicy::default(),
        executor.clone(),
    ));

    let outcome = scheduler.clone().run().await;

    assert_eq!(outcome, Ok(3));
    assert_eq!(scheduler.state(), RetryState::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_policy_gives_up_immediately() {
    let executor = CountingExecutor::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let scheduler = Arc::new(RetryScheduler::new(
        visible_after(usize::MAX, calls.clone()),
        RetryPolicy::single_attempt(),
        executor.clone(),
    ));

    let outcome = scheduler.run().await;

    assert_eq!(outcome, Err(QueryError::RetryExhausted { attempts: 1 }));
    assert_eq!(executor.scheduled(), 0);
}
