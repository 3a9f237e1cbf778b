use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rstest::rstest;
use spindle_core::impls::{MemoryEventSink, PidFileLock};
use spindle_core::ports::InstanceLock;
use spindle_core::sample::FailurePlan;
use spindle_core::{
    BoxError, Failure, PoolError, PoolEvent, PoolState, WorkerPool, await_all,
    await_all_with_timeout, run_batch, task_fn,
};

const GRACE: Duration = Duration::from_secs(10);

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn await_all_returns_every_outcome_in_submission_order(
    #[values(1, 2, 4, 8)] workers: usize,
    #[values(0, 1, 17, 200)] tasks: usize,
) {
    let pool = WorkerPool::new(workers).unwrap();

    let handles: Vec<_> = (0..tasks)
        .map(|i| {
            pool.submit(task_fn(move || async move {
                // later tasks finish first
                tokio::time::sleep(Duration::from_micros(((tasks - i) % 7) as u64 * 100)).await;
                Ok::<_, BoxError>(i)
            }))
            .unwrap()
        })
        .collect();

    let outcomes = await_all(handles).await;
    assert_eq!(outcomes.len(), tasks);
    for (i, outcome) in outcomes.into_iter().enumerate() {
        assert_eq!(outcome, Ok(i));
    }

    let report = pool.shutdown(GRACE).await;
    assert!(report.drained_naturally);
    assert_eq!(report.completed_count, tasks);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn each_task_runs_once_and_resolves_its_own_handle() {
    const TASKS: usize = 5_000;
    let pool = WorkerPool::new(8).unwrap();
    let runs: Arc<Vec<AtomicUsize>> = Arc::new((0..TASKS).map(|_| AtomicUsize::new(0)).collect());

    let handles: Vec<_> = (0..TASKS)
        .map(|i| {
            let runs = Arc::clone(&runs);
            pool.submit(task_fn(move || async move {
                runs[i].fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok::<_, BoxError>(i)
            }))
            .unwrap()
        })
        .collect();

    let ids: HashSet<_> = handles.iter().map(|h| h.task_id()).collect();
    assert_eq!(ids.len(), TASKS);

    let outcomes = await_all(handles).await;
    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome, &Ok(i));
    }
    assert!(runs.iter().all(|count| count.load(Ordering::SeqCst) == 1));

    let report = pool.shutdown(GRACE).await;
    assert_eq!(report.completed_count, TASKS);
    assert_eq!(report.cancelled_count, 0);
}

#[rstest]
#[case(1)]
#[case(3)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_task_does_not_kill_its_worker(#[case] workers: usize) {
    let pool = WorkerPool::new(workers).unwrap();

    let mut handles = Vec::new();
    for i in 0..30_usize {
        let handle = pool
            .submit(task_fn(move || async move {
                match i % 3 {
                    0 => Err(BoxError::from(format!("task {i} failed"))),
                    1 => panic!("task {i} panicked"),
                    _ => Ok(i),
                }
            }))
            .unwrap();
        handles.push(handle);
    }

    let outcomes = await_all(handles).await;
    for (i, outcome) in outcomes.iter().enumerate() {
        match i % 3 {
            0 => assert_eq!(outcome, &Err(Failure::Task(format!("task {i} failed")))),
            1 => assert_eq!(outcome, &Err(Failure::Panicked(format!("task {i} panicked")))),
            _ => assert_eq!(outcome, &Ok(i)),
        }
    }

    // the pool still works afterwards
    let after = pool.submit(task_fn(|| async { Ok::<_, BoxError>("alive") })).unwrap();
    assert_eq!(after.await, Ok("alive"));

    let report = pool.shutdown(GRACE).await;
    assert!(report.drained_naturally);
    assert_eq!(report.completed_count, 31);
}

#[tokio::test]
async fn single_worker_dequeues_in_fifo_order() {
    let pool = WorkerPool::new(1).unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..50)
        .map(|i| {
            let order = Arc::clone(&order);
            pool.submit(task_fn(move || async move {
                order.lock().push(i);
                Ok::<_, BoxError>(())
            }))
            .unwrap()
        })
        .collect();
    await_all(handles).await;

    assert_eq!(*order.lock(), (0..50).collect::<Vec<_>>());
    pool.shutdown(GRACE).await;
}

#[tokio::test]
async fn every_submit_after_shutdown_is_pool_closed() {
    let pool = WorkerPool::new(2).unwrap();
    let before = pool.submit(task_fn(|| async { Ok::<_, BoxError>(1) })).unwrap();
    assert_eq!(before.await, Ok(1));

    pool.shutdown(GRACE).await;
    assert_eq!(pool.state(), PoolState::Terminated);

    for _ in 0..10 {
        let result = pool.submit(task_fn(|| async { Ok::<_, BoxError>(2) }));
        assert_eq!(result.err(), Some(PoolError::PoolClosed));
    }
}

#[tokio::test]
async fn shutdown_after_completion_drains_naturally() {
    let pool = WorkerPool::new(4).unwrap();
    let handles: Vec<_> = (0..20)
        .map(|i| pool.submit(task_fn(move || async move { Ok::<_, BoxError>(i) })).unwrap())
        .collect();
    await_all(handles).await;

    let report = pool.shutdown(Duration::from_millis(500)).await;
    assert!(report.drained_naturally);
    assert_eq!(report.cancelled_count, 0);
    assert_eq!(report.completed_count, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_task_is_cancelled_when_deadline_passes() {
    let sink = Arc::new(MemoryEventSink::new());
    let pool = WorkerPool::builder()
        .worker_count(2)
        .event_sink(sink.clone())
        .build()
        .unwrap();

    let quick = pool.submit(task_fn(|| async { Ok::<_, BoxError>("quick") })).unwrap();
    assert_eq!(quick.await, Ok("quick"));

    let slow = pool
        .submit(task_fn(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, BoxError>("slow")
        }))
        .unwrap();
    // let a worker pick it up
    tokio::time::sleep(Duration::from_millis(50)).await;

    let report = pool.shutdown(Duration::from_millis(100)).await;
    assert!(!report.drained_naturally);
    assert_eq!(report.cancelled_count, 1);
    assert_eq!(report.completed_count, 1);
    assert_eq!(slow.await, Err(Failure::Cancelled));
    assert_eq!(pool.state(), PoolState::Terminated);

    assert_eq!(
        sink.count(|e| matches!(e, PoolEvent::ShutdownEscalated { cancelled_count: 1 })),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn thread_blocking_task_is_cancelled_within_the_deadline() {
    let pool = WorkerPool::new(1).unwrap();
    let blocking = pool
        .submit(task_fn(|| async {
            std::thread::sleep(Duration::from_millis(1500));
            Ok::<_, BoxError>("blocking")
        }))
        .unwrap();
    while pool.stats().in_flight == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let started = std::time::Instant::now();
    let report = pool.shutdown(Duration::from_millis(100)).await;
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(1), "shutdown took {elapsed:?}");
    assert!(!report.drained_naturally);
    assert_eq!(report.cancelled_count, 1);
    assert_eq!(report.completed_count, 0);
    assert_eq!(blocking.await, Err(Failure::Cancelled));
    assert_eq!(pool.stats().outstanding(), 0);
}

#[tokio::test]
async fn await_all_with_timeout_gives_partial_results() {
    let pool = WorkerPool::new(2).unwrap();
    let fast = pool.submit(task_fn(|| async { Ok::<_, BoxError>(1) })).unwrap();
    let hung = pool
        .submit(task_fn(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, BoxError>(2)
        }))
        .unwrap();

    let outcomes = await_all_with_timeout(vec![fast, hung], Duration::from_millis(100)).await;
    assert_eq!(outcomes, vec![Ok(1), Err(Failure::TimedOut)]);

    let report = pool.shutdown(Duration::from_millis(50)).await;
    assert_eq!(report.cancelled_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn thousand_id_tasks_on_four_workers() {
    let pool = WorkerPool::new(4).unwrap();
    let plan = FailurePlan::Seeded { rate: 0.5, seed: 2024 };
    let expected = plan.modes(1_000).iter().filter(|m| m.should_fail()).count();

    let (summary, outcomes) = run_batch(&pool, &plan, 1_000, GRACE).await.unwrap();

    assert_eq!(outcomes.len(), 1_000);
    assert_eq!(summary.expected_failures, Some(expected));
    assert_eq!(summary.failed, expected);
    assert_eq!(summary.succeeded, 1_000 - expected);
    assert_eq!(summary.cancelled, 0);
    assert!(summary.report.drained_naturally);

    let tokens: HashSet<_> = outcomes.iter().filter_map(|o| o.as_ref().ok()).collect();
    assert_eq!(tokens.len(), summary.succeeded);
}

#[test]
fn pid_lock_acquire_and_release_twice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pid-example");
    let lock = PidFileLock::new();

    assert!(lock.acquire(&path).unwrap());
    assert!(!lock.acquire(&path).unwrap());
    assert!(lock.release(&path).unwrap());
    assert!(!lock.release(&path).unwrap());
}
