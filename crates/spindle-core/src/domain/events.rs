//! Events - pool lifecycle events
//!
//! The pool reports what it does through `ports::EventSink` instead of
//! logging directly, so callers decide where the events go.

use std::time::Duration;

use serde::Serialize;

use super::ids::{TaskId, WorkerId};
use super::outcome::Failure;
use super::report::ShutdownReport;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    PoolStarted { worker_count: usize },
    TaskSubmitted { task_id: TaskId },
    TaskStarted { task_id: TaskId, worker_id: WorkerId },
    TaskSucceeded { task_id: TaskId, worker_id: WorkerId },
    TaskFailed { task_id: TaskId, worker_id: WorkerId, failure: Failure },
    WorkerStopped { worker_id: WorkerId },
    ShutdownRequested { timeout: Duration },
    ShutdownEscalated { cancelled_count: usize },
    PoolTerminated { report: ShutdownReport },
}

impl PoolEvent {
    /// Task the event is about, if any.
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            PoolEvent::TaskSubmitted { task_id }
            | PoolEvent::TaskStarted { task_id, .. }
            | PoolEvent::TaskSucceeded { task_id, .. }
            | PoolEvent::TaskFailed { task_id, .. } => Some(*task_id),
            _ => None,
        }
    }
}
