//! Batch driver: submit everything, wait for everything, then shut down.
//!
//! One failing task never aborts the batch; failures are logged and counted.

use std::time::Duration;

use serde::Serialize;
use ulid::Ulid;

use crate::domain::{Outcome, ShutdownReport};
use crate::error::PoolError;
use crate::pool::{WorkerPool, await_all};
use crate::sample::FailurePlan;

/// Aggregate of one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Tasks the plan flagged to fail; `None` when decided at run time.
    pub expected_failures: Option<usize>,
    pub report: ShutdownReport,
}

impl BatchSummary {
    /// Tally outcomes. Cancellations are counted apart from task failures.
    fn tally<T>(outcomes: &[Outcome<T>], report: ShutdownReport) -> Self {
        let mut summary = BatchSummary {
            submitted: outcomes.len(),
            succeeded: 0,
            failed: 0,
            cancelled: 0,
            expected_failures: None,
            report,
        };
        for outcome in outcomes {
            match outcome {
                Ok(_) => summary.succeeded += 1,
                Err(failure) if failure.is_cancelled() => summary.cancelled += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }
}

/// Run `count` sample tasks from `plan` on `pool`, collect every outcome in
/// submission order, then shut the pool down within `shutdown_timeout`.
///
/// Errors only for pool-level problems (the pool was already closed).
pub async fn run_batch(
    pool: &WorkerPool,
    plan: &FailurePlan,
    count: usize,
    shutdown_timeout: Duration,
) -> Result<(BatchSummary, Vec<Outcome<Ulid>>), PoolError> {
    let tasks = plan.tasks(count);
    let expected_failures = tasks
        .iter()
        .all(|task| task.mode().is_deterministic())
        .then(|| tasks.iter().filter(|task| task.mode().should_fail()).count());

    let handles = tasks
        .into_iter()
        .map(|task| pool.submit(task))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!(submitted = handles.len(), "batch submitted");

    let outcomes = await_all(handles).await;
    for (index, outcome) in outcomes.iter().enumerate() {
        if let Err(failure) = outcome {
            tracing::warn!(index, %failure, "task did not produce a token");
        }
    }

    let report = pool.shutdown(shutdown_timeout).await;
    let mut summary = BatchSummary::tally(&outcomes, report);
    summary.expected_failures = expected_failures;

    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        cancelled = summary.cancelled,
        "batch finished"
    );
    Ok((summary, outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Failure;

    #[test]
    fn tally_separates_cancellations() {
        let outcomes: Vec<Outcome<u8>> = vec![
            Ok(1),
            Err(Failure::Task("x".into())),
            Err(Failure::Panicked("y".into())),
            Err(Failure::Cancelled),
        ];
        let summary = BatchSummary::tally(&outcomes, ShutdownReport::default());
        assert_eq!(summary.submitted, 4);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.cancelled, 1);
    }

    #[tokio::test]
    async fn every_nth_plan_reports_expected_failures() {
        let pool = WorkerPool::new(2).unwrap();
        let (summary, outcomes) = run_batch(&pool, &FailurePlan::EveryNth(4), 20, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 20);
        assert_eq!(summary.expected_failures, Some(5));
        assert_eq!(summary.failed, 5);
        assert_eq!(summary.succeeded, 15);
        assert!(summary.report.drained_naturally);
        assert!(outcomes[3].is_err());
        assert!(outcomes[4].is_ok());
    }

    #[tokio::test]
    async fn closed_pool_is_a_pool_error() {
        let pool = WorkerPool::new(1).unwrap();
        pool.shutdown(Duration::from_secs(1)).await;

        let err = run_batch(&pool, &FailurePlan::None, 3, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, PoolError::PoolClosed);
    }

    #[tokio::test]
    async fn empty_batch_is_fine() {
        let pool = WorkerPool::new(1).unwrap();
        let (summary, outcomes) = run_batch(&pool, &FailurePlan::All, 0, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(outcomes.is_empty());
        assert_eq!(summary.expected_failures, Some(0));
        assert_eq!(summary.report.completed_count, 0);
    }
}
