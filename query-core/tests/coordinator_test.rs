use query_core::{partition, ChunkCoordinator, CoordinatorPhase, QueryError, TransportError};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

type Outcomes = Arc<Mutex<Vec<Result<Vec<u32>, QueryError>>>>;

fn coordinator(chunk_count: u32) -> (Arc<ChunkCoordinator<u32>>, Outcomes) {
    let chunks = partition((0..chunk_count).collect(), 1).unwrap();
    let outcomes: Outcomes = Arc::new(Mutex::new(Vec::new()));
    let sink = outcomes.clone();
    let coordinator = ChunkCoordinator::new(
        &chunks,
        Box::new(move |outcome| sink.lock().unwrap().push(outcome)),
    );
    (Arc::new(coordinator), outcomes)
}

#[test]
fn test_concurrent_successes_deliver_once_with_union() {
    const CHUNKS: u32 = 64;
    let (coordinator, outcomes) = coordinator(CHUNKS);
    let barrier = Arc::new(Barrier::new(CHUNKS as usize));

    let workers: Vec<_> = (0..CHUNKS)
        .map(|index| {
            let coordinator = coordinator.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                coordinator.chunk_completed(index as usize, vec![index * 10, index * 10 + 1]);
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let outcomes = outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    let mut items = outcomes[0].clone().unwrap();
    items.sort();
    let mut expected: Vec<u32> = (0..CHUNKS).flat_map(|i| [i * 10, i * 10 + 1]).collect();
    expected.sort();
    assert_eq!(items, expected);
    assert_eq!(coordinator.phase(), CoordinatorPhase::Succeeded);
}

#[test]
fn test_concurrent_failures_deliver_one_failure() {
    const CHUNKS: u32 = 32;
    let (coordinator, outcomes) = coordinator(CHUNKS);
    let barrier = Arc::new(Barrier::new(CHUNKS as usize));

    let workers: Vec<_> = (0..CHUNKS)
        .map(|index| {
            let coordinator = coordinator.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                if index % 3 == 0 {
                    coordinator.chunk_failed(
                        index as usize,
                        QueryError::protocol(format!("chunk {index}")),
                    );
                } else {
                    coordinator.chunk_completed(index as usize, vec![index]);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let outcomes = outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        Err(QueryError::Protocol { reason }) => {
            let failed_index: u32 = reason.trim_start_matches("chunk ").parse().unwrap();
            assert_eq!(failed_index % 3, 0);
        }
        other => panic!("expected a chunk failure, got {other:?}"),
    }
    assert_eq!(coordinator.phase(), CoordinatorPhase::Failed);
}

#[test]
fn test_fail_fail_succeed_sequence() {
    let (coordinator, outcomes) = coordinator(3);
    let error_a = QueryError::Transport(TransportError::Timeout {
        timeout_ms: 30_000,
        endpoint: "transfers".to_string(),
    });

    coordinator.chunk_failed(0, error_a.clone());
    coordinator.chunk_failed(1, QueryError::protocol("B"));
    coordinator.chunk_completed(2, vec![7]);

    assert_eq!(*outcomes.lock().unwrap(), vec![Err(error_a)]);
}

#[test]
fn test_success_waits_for_last_chunk() {
    let (coordinator, outcomes) = coordinator(3);

    coordinator.chunk_completed(1, vec![1]);
    coordinator.chunk_completed(0, vec![0]);
    assert!(outcomes.lock().unwrap().is_empty());
    assert_eq!(coordinator.phase(), CoordinatorPhase::Pending);

    coordinator.chunk_completed(2, vec![2]);
    assert_eq!(outcomes.lock().unwrap().len(), 1);
}
