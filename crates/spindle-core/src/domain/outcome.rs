//! Outcome model: what a `ResultHandle` resolves to.
//!
//! A task either produces its value or one `Failure`. The failure is a plain
//! description (no boxed error), so outcomes are `Clone`, comparable in tests
//! and serializable into a batch summary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a task did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Failure {
    /// The task returned an error.
    #[error("task failed: {0}")]
    Task(String),

    /// The task panicked; the worker caught it and kept running.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was queued or in flight when a forced shutdown escalated.
    #[error("task cancelled by forced shutdown")]
    Cancelled,

    /// The caller stopped waiting (`await_all_with_timeout` deadline).
    #[error("gave up waiting for task result")]
    TimedOut,
}

impl Failure {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Failure::Cancelled)
    }

    /// Build a `Panicked` failure from a caught panic payload.
    ///
    /// `panic!("literal")` carries a `&str`, `panic!("{x}")` a `String`;
    /// anything else has no printable message.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Failure::Panicked(message)
    }
}

/// The resolved value of a `ResultHandle`.
pub type Outcome<T> = Result<T, Failure>;
