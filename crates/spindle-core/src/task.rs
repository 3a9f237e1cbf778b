//! Task trait - one independent unit of work
//!
//! # 二層構造
//! - **表層**: `Task` trait（型付き、`Output` を持つ）と `FnTask`（closure adapter）
//! - **内部**: pool は submit 時に `Task` を型消去して `Job` にする（`pool::backlog`）

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

/// Error type a task may fail with. Anything implementing `std::error::Error`
/// (and plain strings) converts into it.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A unit of work executed once by some worker of the pool.
///
/// # 使用例
/// ```ignore
/// struct Double(u32);
///
/// #[async_trait]
/// impl Task for Double {
///     type Output = u32;
///     async fn run(self) -> Result<u32, BoxError> {
///         Ok(self.0 * 2)
///     }
/// }
/// ```
///
/// Panics inside `run` are caught by the pool and reported as
/// `Failure::Panicked`; they never take the worker down.
#[async_trait]
pub trait Task: Send + 'static {
    type Output: Send + 'static;

    async fn run(self) -> Result<Self::Output, BoxError>;
}

/// Adapter turning an async closure into a `Task`.
pub struct FnTask<F, Fut, T, E> {
    f: F,
    _marker: PhantomData<fn() -> (Fut, T, E)>,
}

impl<F, Fut, T, E> FnTask<F, Fut, T, E> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, T, E> Task for FnTask<F, Fut, T, E>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Output = T;

    async fn run(self) -> Result<T, BoxError> {
        (self.f)().await.map_err(Into::into)
    }
}

/// Shorthand for `FnTask::new`.
///
/// ```ignore
/// let handle = pool.submit(task_fn(|| async { Ok::<_, BoxError>(42) }))?;
/// ```
pub fn task_fn<F, Fut, T, E>(f: F) -> FnTask<F, Fut, T, E>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    FnTask::new(f)
}
