use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::backlog::{Backlog, Cancel, JobBody};
use crate::domain::{Failure, Outcome, PoolEvent, WorkerId};
use crate::ports::EventSink;
use crate::task::Task;

/// Wrap a task in the guarded-call boundary.
///
/// Errors and panics both become a `Failure`; nothing escapes into the worker
/// loop. The body and the returned `Cancel` share one sender slot: whichever
/// takes it first resolves the handle, so it resolves exactly once.
pub(crate) fn guard<T: Task>(task: T) -> (JobBody, Cancel, oneshot::Receiver<Outcome<T::Output>>) {
    let (tx, rx) = oneshot::channel();
    let slot = Arc::new(Mutex::new(Some(tx)));

    let cancel_slot = Arc::clone(&slot);
    let cancel: Cancel = Box::new(move || match cancel_slot.lock().take() {
        Some(tx) => {
            let _ = tx.send(Err(Failure::Cancelled));
            true
        }
        None => false,
    });

    let body = async move {
        // run() を async block の中で呼ぶ: 同期部分の panic も catch_unwind の内側になる
        let outcome = match AssertUnwindSafe(async move { task.run().await })
            .catch_unwind()
            .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(Failure::Task(err.to_string())),
            Err(payload) => Err(Failure::from_panic(payload.as_ref())),
        };

        let failure = outcome.as_ref().err().cloned();
        // slot が空なら cancel 済み。receiver が無い (handle drop / timeout) 場合も無視
        let tx = slot.lock().take();
        if let Some(tx) = tx {
            let _ = tx.send(outcome);
        }
        failure
    }
    .boxed();

    (body, cancel, rx)
}

/// Worker loop: dequeue, execute, report. Exits when the backlog is closed
/// and empty. A forced shutdown aborts this task at its current await point;
/// a task that never yields keeps the worker busy, but its handle is already
/// resolved by `Backlog::cancel_remaining` and its result is discarded.
pub(crate) async fn worker_loop(worker_id: WorkerId, backlog: Arc<Backlog>, sink: Arc<dyn EventSink>) {
    while let Some(job) = backlog.next().await {
        let task_id = job.task_id;
        sink.emit(&PoolEvent::TaskStarted { task_id, worker_id });

        let failure = job.body.await;
        // body の完了から finish まで await を挟まない
        if !backlog.finish(task_id) {
            // cancel 済み: 結果は捨てる
            continue;
        }

        match failure {
            None => sink.emit(&PoolEvent::TaskSucceeded { task_id, worker_id }),
            Some(failure) => sink.emit(&PoolEvent::TaskFailed {
                task_id,
                worker_id,
                failure,
            }),
        }
    }

    sink.emit(&PoolEvent::WorkerStopped { worker_id });
}
