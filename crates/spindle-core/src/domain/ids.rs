//! Strongly-typed identifiers.
//!
//! `TaskId` はサブミット順の連番。FIFO の順序と一致するので、
//! ログやテストで「どの順に取り出されたか」を確認できる。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one submitted task. Assigned under the backlog lock, so ids are
/// dense and increase in submission order.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Index of a worker inside its pool (`0..worker_count`).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(usize);

impl WorkerId {
    pub fn new(value: usize) -> Self {
        Self(value)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}
