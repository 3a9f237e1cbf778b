//! Pool lifecycle state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle of a `WorkerPool`.
///
/// State transitions:
/// - Created -> Running (first accepted submission)
/// - Created | Running -> Draining (shutdown requested)
/// - Draining -> Terminated (all workers exited, naturally or after cancellation)
///
/// Using an enum keeps matches exhaustive and invalid states unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    /// Constructed, workers idle, nothing submitted yet.
    Created,

    /// At least one submission accepted.
    Running,

    /// Shutdown requested: no new submissions, existing work may finish.
    Draining,

    /// All workers have exited.
    Terminated,
}

impl PoolState {
    /// Does this state accept new submissions?
    pub fn accepts_submissions(self) -> bool {
        matches!(self, PoolState::Created | PoolState::Running)
    }

    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, PoolState::Terminated)
    }

    /// State after a submission is accepted, or `None` if submissions are closed.
    pub fn on_submit(self) -> Option<PoolState> {
        self.accepts_submissions().then_some(PoolState::Running)
    }

    /// State after a shutdown request. Draining and Terminated are absorbing.
    pub fn on_shutdown(self) -> PoolState {
        match self {
            PoolState::Created | PoolState::Running => PoolState::Draining,
            other => other,
        }
    }
}
