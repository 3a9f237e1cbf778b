//! spindle-core
//!
//! Fixed-size worker pool with per-task result handles and a bounded,
//! escalating shutdown.
//!
//! # モジュール構成
//! - **domain**: ids, lifecycle state, outcomes, shutdown report, events
//! - **task**: `Task` trait と closure adapter
//! - **pool**: `WorkerPool`, backlog, worker loop, `ResultHandle`
//! - **ports**: 抽象化レイヤー（EventSink, Clock, InstanceLock）
//! - **impls**: ports の実装（PidFileLock, TracingEventSink など）
//! - **config**: `PoolConfig`（defaults → JSON file → env）
//! - **sample / batch**: サンプルタスクと batch driver

pub mod batch;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod pool;
pub mod ports;
pub mod sample;
pub mod task;

pub use batch::{BatchSummary, run_batch};
pub use config::PoolConfig;
pub use domain::{Failure, Outcome, PoolEvent, PoolState, PoolStats, ShutdownReport, TaskId, WorkerId};
pub use error::{ConfigError, LockError, PoolError};
pub use pool::{PoolBuilder, ResultHandle, WorkerPool, await_all, await_all_with_timeout};
pub use task::{BoxError, FnTask, Task, task_fn};
