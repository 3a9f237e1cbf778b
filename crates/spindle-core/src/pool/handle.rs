//! ResultHandle - 一つの task の結果を一度だけ受け取る placeholder

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::domain::{Failure, Outcome, TaskId};

/// Handle returned by `WorkerPool::submit`.
///
/// Awaiting it yields the task's `Outcome`. The handle is consumed by the
/// await, so it resolves at most once. If the task is dropped before it
/// reports (forced shutdown, pool dropped) the handle resolves to
/// `Failure::Cancelled`.
#[must_use = "a ResultHandle does nothing unless awaited"]
#[derive(Debug)]
pub struct ResultHandle<T> {
    task_id: TaskId,
    rx: oneshot::Receiver<Outcome<T>>,
}

impl<T> ResultHandle<T> {
    pub(crate) fn new(task_id: TaskId, rx: oneshot::Receiver<Outcome<T>>) -> Self {
        Self { task_id, rx }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }
}

impl<T> Future for ResultHandle<T> {
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(Failure::Cancelled)))
    }
}

/// Wait for every handle. Outcomes come back in the order of `handles`
/// (submission order), not completion order. No cancellation: one hung task
/// hangs the whole collection.
pub async fn await_all<T, I>(handles: I) -> Vec<Outcome<T>>
where
    I: IntoIterator<Item = ResultHandle<T>>,
{
    join_all(handles).await
}

/// Like `await_all`, but stops waiting at a shared deadline. Handles not
/// resolved by then yield `Failure::TimedOut`; their tasks keep running and
/// the late result is discarded.
pub async fn await_all_with_timeout<T, I>(handles: I, timeout: Duration) -> Vec<Outcome<T>>
where
    I: IntoIterator<Item = ResultHandle<T>>,
{
    let deadline = Instant::now() + timeout;
    join_all(handles.into_iter().map(|handle| async move {
        tokio::time::timeout_at(deadline, handle)
            .await
            .unwrap_or(Err(Failure::TimedOut))
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle<T>(id: u64) -> (oneshot::Sender<Outcome<T>>, ResultHandle<T>) {
        let (tx, rx) = oneshot::channel();
        (tx, ResultHandle::new(TaskId::new(id), rx))
    }

    #[tokio::test]
    async fn resolves_to_sent_outcome() {
        let (tx, h) = handle::<u32>(1);
        assert_eq!(h.task_id(), TaskId::new(1));
        tx.send(Ok(3)).unwrap();
        assert_eq!(h.await, Ok(3));
    }

    #[tokio::test]
    async fn dropped_sender_means_cancelled() {
        let (tx, h) = handle::<u32>(1);
        drop(tx);
        assert_eq!(h.await, Err(Failure::Cancelled));
    }

    #[tokio::test]
    async fn await_all_keeps_submission_order() {
        let (tx1, h1) = handle::<u32>(1);
        let (tx2, h2) = handle::<u32>(2);
        let (tx3, h3) = handle::<u32>(3);

        // resolve in reverse
        tx3.send(Ok(30)).unwrap();
        tx2.send(Err(Failure::Task("two".into()))).unwrap();
        tx1.send(Ok(10)).unwrap();

        let outcomes = await_all(vec![h1, h2, h3]).await;
        assert_eq!(
            outcomes,
            vec![Ok(10), Err(Failure::Task("two".into())), Ok(30)]
        );
    }

    #[tokio::test]
    async fn await_all_of_nothing_is_empty() {
        let outcomes: Vec<Outcome<u32>> = await_all(Vec::new()).await;
        assert!(outcomes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_marks_unresolved_handles() {
        let (tx1, h1) = handle::<u32>(1);
        let (_tx2, h2) = handle::<u32>(2);
        tx1.send(Ok(1)).unwrap();

        let outcomes = await_all_with_timeout(vec![h1, h2], Duration::from_millis(100)).await;
        assert_eq!(outcomes, vec![Ok(1), Err(Failure::TimedOut)]);
    }
}
