//! Shutdown report and point-in-time pool counters.

use serde::{Deserialize, Serialize};

/// Result of `WorkerPool::shutdown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShutdownReport {
    /// Tasks whose handle was resolved by a worker (value, error or panic).
    pub completed_count: usize,

    /// Tasks resolved as `Failure::Cancelled` by the forced escalation.
    pub cancelled_count: usize,

    /// `true` when the backlog and in-flight work finished before the deadline.
    pub drained_naturally: bool,
}

/// Snapshot of the pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolStats {
    pub queued: usize,
    pub in_flight: usize,
    pub completed: usize,
}

impl PoolStats {
    /// Submitted but not yet resolved.
    pub fn outstanding(&self) -> usize {
        self.queued + self.in_flight
    }
}
