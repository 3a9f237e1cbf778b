//! Shared FIFO backlog.
//!
//! # 実装詳細
//! - lifecycle, 待ち行列, カウンタを一つの Mutex にまとめる（同期境界は一つだけ）
//! - `Notify` で push / close を待機中の worker に通知
//! - ロックを握ったまま await しない、job の drop もロック外で行う
//! - 実行中 job の `Cancel` は backlog が持つ: worker が止まらなくても handle は解決できる

use std::collections::{HashMap, VecDeque};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::domain::{Failure, PoolState, PoolStats, TaskId};
use crate::error::PoolError;

/// Type-erased task body. Resolves the task's handle itself and returns the
/// failure (if any) so the worker can report it.
pub(crate) type JobBody = BoxFuture<'static, Option<Failure>>;

/// Resolves the task's handle with `Failure::Cancelled`. Returns `false` when
/// the body already resolved it.
pub(crate) type Cancel = Box<dyn FnOnce() -> bool + Send>;

pub(crate) struct Job {
    pub(crate) task_id: TaskId,
    pub(crate) body: JobBody,
}

struct Queued {
    job: Job,
    cancel: Cancel,
}

struct BacklogState {
    lifecycle: PoolState,
    jobs: VecDeque<Queued>,
    next_task_id: u64,
    in_flight: HashMap<TaskId, Cancel>,
    completed: usize,
}

pub(crate) struct Backlog {
    state: Mutex<BacklogState>,
    notify: Notify,
}

impl Backlog {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(BacklogState {
                lifecycle: PoolState::Created,
                jobs: VecDeque::new(),
                next_task_id: 1,
                in_flight: HashMap::new(),
                completed: 0,
            }),
            notify: Notify::new(),
        }
    }

    /// Append a job. Never waits for capacity; rejects once shutdown started.
    pub(crate) fn push(&self, body: JobBody, cancel: Cancel) -> Result<TaskId, PoolError> {
        let task_id = {
            let mut state = self.state.lock();
            let Some(next) = state.lifecycle.on_submit() else {
                return Err(PoolError::PoolClosed);
            };
            state.lifecycle = next;

            let task_id = TaskId::new(state.next_task_id);
            state.next_task_id += 1;
            state.jobs.push_back(Queued {
                job: Job { task_id, body },
                cancel,
            });
            task_id
        };
        self.notify.notify_one();
        Ok(task_id)
    }

    /// Dequeue the oldest job, waiting while the backlog is empty.
    ///
    /// Returns `None` once shutdown has started and nothing is left, which is
    /// the worker's signal to exit.
    pub(crate) async fn next(&self) -> Option<Job> {
        loop {
            // close() は notify_waiters なので、状態確認の前に waiter 登録しておく
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(Queued { job, cancel }) = state.jobs.pop_front() {
                    state.in_flight.insert(job.task_id, cancel);
                    return Some(job);
                }
                if !state.lifecycle.accepts_submissions() {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Record that a dequeued job ran to the end.
    ///
    /// Returns `false` if the job was already cancelled by `cancel_remaining`;
    /// it is then not counted as completed.
    pub(crate) fn finish(&self, task_id: TaskId) -> bool {
        let mut state = self.state.lock();
        if state.in_flight.remove(&task_id).is_none() {
            return false;
        }
        state.completed += 1;
        true
    }

    /// Stop accepting submissions and wake every idle worker.
    pub(crate) fn close(&self) {
        {
            let mut state = self.state.lock();
            state.lifecycle = state.lifecycle.on_shutdown();
        }
        self.notify.notify_waiters();
    }

    /// Resolve every queued and in-flight handle with `Failure::Cancelled` and
    /// return how many were cancelled.
    ///
    /// Does not wait for workers: a task still running on its worker keeps
    /// running, but its result is discarded and `finish` no longer counts it.
    /// An in-flight task whose body resolved the handle first counts as
    /// completed instead.
    pub(crate) fn cancel_remaining(&self) -> usize {
        let (queued, in_flight) = {
            let mut state = self.state.lock();
            let queued: Vec<Queued> = state.jobs.drain(..).collect();
            let in_flight: Vec<Cancel> = state.in_flight.drain().map(|(_, cancel)| cancel).collect();
            (queued, in_flight)
        };

        // cancel はロック外で呼ぶ (body の drop も同様)
        let mut cancelled = 0;
        for Queued { job, cancel } in queued {
            drop(job);
            if cancel() {
                cancelled += 1;
            }
        }
        let mut late = 0;
        for cancel in in_flight {
            if cancel() {
                cancelled += 1;
            } else {
                late += 1;
            }
        }
        if late > 0 {
            self.state.lock().completed += late;
        }
        cancelled
    }

    pub(crate) fn terminate(&self) {
        self.state.lock().lifecycle = PoolState::Terminated;
    }

    pub(crate) fn lifecycle(&self) -> PoolState {
        self.state.lock().lifecycle
    }

    pub(crate) fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            queued: state.jobs.len(),
            in_flight: state.in_flight.len(),
            completed: state.completed,
        }
    }
}
