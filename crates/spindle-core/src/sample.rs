//! Sample workload: tasks that return a fresh random token or fail on demand.
//!
//! Failure injection is explicit. `FailurePlan` decides up front which task
//! indexes fail, so a test knows the expected failure count before the batch
//! runs. `ClockParity` keeps the classic behaviour (fail when the current
//! millisecond timestamp is even) behind the `Clock` port.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use ulid::Ulid;

use crate::ports::Clock;
use crate::task::{BoxError, Task};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("injected failure in task {index}")]
    Injected { index: usize },
}

/// When a single `IdTask` fails.
#[derive(Clone)]
pub enum FailureMode {
    Never,
    Always,
    /// Fail if `clock.now()` has an even millisecond timestamp at run time.
    ClockParity(Arc<dyn Clock>),
}

impl FailureMode {
    pub fn should_fail(&self) -> bool {
        match self {
            FailureMode::Never => false,
            FailureMode::Always => true,
            FailureMode::ClockParity(clock) => clock.now().timestamp_millis() % 2 == 0,
        }
    }

    /// Known ahead of time? `ClockParity` is only decided when the task runs.
    pub fn is_deterministic(&self) -> bool {
        !matches!(self, FailureMode::ClockParity(_))
    }
}

impl fmt::Debug for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureMode::Never => f.write_str("Never"),
            FailureMode::Always => f.write_str("Always"),
            FailureMode::ClockParity(_) => f.write_str("ClockParity"),
        }
    }
}

/// Returns a new ULID, unless its failure mode says otherwise.
#[derive(Debug, Clone)]
pub struct IdTask {
    index: usize,
    mode: FailureMode,
}

impl IdTask {
    pub fn new(index: usize, mode: FailureMode) -> Self {
        Self { index, mode }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn mode(&self) -> &FailureMode {
        &self.mode
    }
}

#[async_trait]
impl Task for IdTask {
    type Output = Ulid;

    async fn run(self) -> Result<Ulid, BoxError> {
        tracing::trace!(index = self.index, "id task running");

        if self.mode.should_fail() {
            return Err(SampleError::Injected { index: self.index }.into());
        }

        let token = Ulid::new();
        tracing::trace!(index = self.index, %token, "id task produced token");
        Ok(token)
    }
}

/// Which tasks of a batch fail.
#[derive(Clone)]
pub enum FailurePlan {
    None,
    All,
    /// Indexes `n-1, 2n-1, ...` fail (every n-th task). `0` means none.
    EveryNth(usize),
    /// Each task fails with probability `rate`, drawn from a seeded RNG.
    Seeded { rate: f64, seed: u64 },
    ClockParity(Arc<dyn Clock>),
}

impl FailurePlan {
    pub fn modes(&self, count: usize) -> Vec<FailureMode> {
        match self {
            FailurePlan::None => vec![FailureMode::Never; count],
            FailurePlan::All => vec![FailureMode::Always; count],
            FailurePlan::EveryNth(n) => (0..count)
                .map(|i| {
                    if *n > 0 && (i + 1) % n == 0 {
                        FailureMode::Always
                    } else {
                        FailureMode::Never
                    }
                })
                .collect(),
            FailurePlan::Seeded { rate, seed } => {
                let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
                let mut rng = StdRng::seed_from_u64(*seed);
                (0..count)
                    .map(|_| {
                        if rng.gen_bool(rate) {
                            FailureMode::Always
                        } else {
                            FailureMode::Never
                        }
                    })
                    .collect()
            }
            FailurePlan::ClockParity(clock) => {
                vec![FailureMode::ClockParity(Arc::clone(clock)); count]
            }
        }
    }

    pub fn tasks(&self, count: usize) -> Vec<IdTask> {
        self.modes(count)
            .into_iter()
            .enumerate()
            .map(|(index, mode)| IdTask::new(index, mode))
            .collect()
    }
}

impl fmt::Debug for FailurePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePlan::None => f.write_str("None"),
            FailurePlan::All => f.write_str("All"),
            FailurePlan::EveryNth(n) => f.debug_tuple("EveryNth").field(n).finish(),
            FailurePlan::Seeded { rate, seed } => f
                .debug_struct("Seeded")
                .field("rate", rate)
                .field("seed", seed)
                .finish(),
            FailurePlan::ClockParity(_) => f.write_str("ClockParity"),
        }
    }
}
