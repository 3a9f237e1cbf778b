use parking_lot::Mutex;

use crate::domain::PoolEvent;
use crate::ports::EventSink;

/// Default sink: per-task events at debug, lifecycle at info, failures at warn.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &PoolEvent) {
        match event {
            PoolEvent::PoolStarted { worker_count } => {
                tracing::info!(worker_count, "worker pool started");
            }
            PoolEvent::TaskSubmitted { task_id } => {
                tracing::debug!(%task_id, "task submitted");
            }
            PoolEvent::TaskStarted { task_id, worker_id } => {
                tracing::debug!(%task_id, %worker_id, "task started");
            }
            PoolEvent::TaskSucceeded { task_id, worker_id } => {
                tracing::debug!(%task_id, %worker_id, "task succeeded");
            }
            PoolEvent::TaskFailed {
                task_id,
                worker_id,
                failure,
            } => {
                tracing::warn!(%task_id, %worker_id, %failure, "task failed");
            }
            PoolEvent::WorkerStopped { worker_id } => {
                tracing::debug!(%worker_id, "worker stopped");
            }
            PoolEvent::ShutdownRequested { timeout } => {
                tracing::info!(timeout_ms = timeout.as_millis() as u64, "shutdown requested");
            }
            PoolEvent::ShutdownEscalated { cancelled_count } => {
                tracing::warn!(cancelled_count, "shutdown deadline passed, cancelling remaining tasks");
            }
            PoolEvent::PoolTerminated { report } => {
                tracing::info!(
                    completed = report.completed_count,
                    cancelled = report.cancelled_count,
                    drained_naturally = report.drained_naturally,
                    "worker pool terminated"
                );
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<PoolEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PoolEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&PoolEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &PoolEvent) {
        self.events.lock().push(event.clone());
    }
}
