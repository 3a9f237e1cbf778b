//! WorkerPool: fixed set of workers over one shared FIFO backlog.
//!
//! Design intent:
//! - Workers are tokio tasks spawned at construction (like a `WorkerGroup`).
//! - `submit` never waits for capacity; the backlog is unbounded.
//! - Task failures stay inside the task boundary (`worker::guard`).
//! - `shutdown` drains within a deadline, then aborts whatever is left.

mod backlog;
mod handle;
mod worker;

pub use handle::{ResultHandle, await_all, await_all_with_timeout};

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::Instrument;

use self::backlog::Backlog;
use crate::config::PoolConfig;
use crate::domain::{PoolEvent, PoolState, PoolStats, ShutdownReport, WorkerId};
use crate::error::PoolError;
use crate::impls::TracingEventSink;
use crate::ports::EventSink;
use crate::task::Task;

/// How long a forced shutdown waits for aborted workers before leaving them
/// behind. Only a task that blocks its thread outlives this.
const ABORT_GRACE: Duration = Duration::from_millis(200);

/// Worker join handles plus the cached report; guarded by an async mutex so
/// concurrent `shutdown` calls run the sequence once.
struct ShutdownSlot {
    workers: JoinSet<()>,
    report: Option<ShutdownReport>,
}

pub struct WorkerPool {
    backlog: Arc<Backlog>,
    sink: Arc<dyn EventSink>,
    worker_count: usize,
    shutdown: tokio::sync::Mutex<ShutdownSlot>,
}

impl WorkerPool {
    /// Create a pool with `worker_count` workers and the tracing event sink.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(worker_count: usize) -> Result<Self, PoolError> {
        Self::builder().worker_count(worker_count).build()
    }

    pub fn from_config(config: &PoolConfig) -> Result<Self, PoolError> {
        Self::builder().worker_count(config.worker_count).build()
    }

    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Append a task to the backlog and return its handle.
    ///
    /// Fails with `PoolClosed` once `shutdown` has been called; the task is
    /// dropped without running.
    pub fn submit<T: Task>(&self, task: T) -> Result<ResultHandle<T::Output>, PoolError> {
        let (body, cancel, rx) = worker::guard(task);
        let task_id = self.backlog.push(body, cancel)?;
        self.sink.emit(&PoolEvent::TaskSubmitted { task_id });
        Ok(ResultHandle::new(task_id, rx))
    }

    /// Stop accepting work and wait up to `timeout` for the backlog and
    /// in-flight tasks to finish. On timeout, abort all workers: every task
    /// still queued or running resolves to `Failure::Cancelled` right away,
    /// even one that blocks its thread and cannot be aborted.
    ///
    /// Calling it again returns the first report.
    pub async fn shutdown(&self, timeout: Duration) -> ShutdownReport {
        let mut slot = self.shutdown.lock().await;
        if let Some(report) = slot.report {
            return report;
        }

        self.backlog.close();
        self.sink.emit(&PoolEvent::ShutdownRequested { timeout });

        let workers = &mut slot.workers;
        let drained_naturally = tokio::time::timeout(timeout, async {
            while workers.join_next().await.is_some() {}
        })
        .await
        .is_ok();

        let cancelled_count = if drained_naturally {
            0
        } else {
            // abort は次の await 地点で効く。handle は worker の終了を待たずに解決する
            workers.abort_all();
            let cancelled_count = self.backlog.cancel_remaining();
            self.sink.emit(&PoolEvent::ShutdownEscalated { cancelled_count });

            let joined = tokio::time::timeout(ABORT_GRACE, async {
                while workers.join_next().await.is_some() {}
            })
            .await
            .is_ok();
            if !joined {
                tracing::warn!(
                    busy_workers = workers.len(),
                    "workers did not stop after abort; leaving them behind"
                );
            }
            cancelled_count
        };

        self.backlog.terminate();
        let report = ShutdownReport {
            completed_count: self.backlog.stats().completed,
            cancelled_count,
            drained_naturally,
        };
        slot.report = Some(report);
        self.sink.emit(&PoolEvent::PoolTerminated { report });
        report
    }

    pub fn state(&self) -> PoolState {
        self.backlog.lifecycle()
    }

    pub fn stats(&self) -> PoolStats {
        self.backlog.stats()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

impl Drop for WorkerPool {
    /// Dropping a pool that was not shut down aborts its workers and resolves
    /// every queued or running handle with `Failure::Cancelled`.
    fn drop(&mut self) {
        if self.backlog.lifecycle().is_terminal() {
            return;
        }
        self.backlog.close();
        self.shutdown.get_mut().workers.abort_all();
        self.backlog.cancel_remaining();
    }
}

/// Builder for `WorkerPool`.
///
/// # Fail-fast 設計
/// - `build()` で worker_count を検証し、0 なら `InvalidConfiguration`
pub struct PoolBuilder {
    worker_count: usize,
    sink: Option<Arc<dyn EventSink>>,
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self {
            worker_count: PoolConfig::DEFAULT_WORKER_COUNT,
            sink: None,
        }
    }

    pub fn worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Where pool events go. Defaults to `TracingEventSink`.
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate and spawn the workers. Must be called inside a tokio runtime.
    ///
    /// Workers run inside the span that is current here, so task logs keep
    /// the caller's context (e.g. the CLI's `run_id`).
    pub fn build(self) -> Result<WorkerPool, PoolError> {
        if self.worker_count == 0 {
            return Err(PoolError::InvalidConfiguration(
                "worker_count must be at least 1".to_string(),
            ));
        }

        let sink: Arc<dyn EventSink> = match self.sink {
            Some(sink) => sink,
            None => Arc::new(TracingEventSink),
        };
        let backlog = Arc::new(Backlog::new());

        let mut workers = JoinSet::new();
        for index in 0..self.worker_count {
            workers.spawn(
                worker::worker_loop(WorkerId::new(index), Arc::clone(&backlog), Arc::clone(&sink))
                    .in_current_span(),
            );
        }
        sink.emit(&PoolEvent::PoolStarted {
            worker_count: self.worker_count,
        });

        Ok(WorkerPool {
            backlog,
            sink,
            worker_count: self.worker_count,
            shutdown: tokio::sync::Mutex::new(ShutdownSlot {
                workers,
                report: None,
            }),
        })
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
