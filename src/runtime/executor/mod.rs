//! Executors
//!
//! An executor is anything that can run a [`Job`]. The contract is the
//! [`Executor`] trait; adapters cover the other shapes a scheduler may come in:
//!
//! - a plain callable taking the job: [`from_fn`] / [`FnExecutor`]
//! - a "two-way" scheduler that hands back a completion future:
//!   [`TwoWayExecutor`], used through [`OneWay`]
//!
//! Arguments are captured by the job closure, so a single `execute(job)`
//! entry point covers both argument-passing styles.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::runtime::error::{Error, Outcome};
use crate::runtime::future::{make_future_promise_pair, Future};

/// Unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs jobs.
pub trait Executor: Send + Sync + 'static {
    /// Run `job`, now or later, on this executor.
    ///
    /// An executor that cannot accept the job drops it; any promise captured
    /// by the job then reports a broken promise downstream.
    fn execute(
        &self,
        job: Job,
    );
}

impl<E> Executor for Arc<E>
where
    E: Executor + ?Sized,
{
    #[inline]
    fn execute(
        &self,
        job: Job,
    ) {
        (**self).execute(job)
    }
}

impl<E> Executor for Box<E>
where
    E: Executor + ?Sized,
{
    #[inline]
    fn execute(
        &self,
        job: Job,
    ) {
        (**self).execute(job)
    }
}

/// Runs every job synchronously on the submitting thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    #[inline]
    fn execute(
        &self,
        job: Job,
    ) {
        job()
    }
}

/// Executor backed by a callable that accepts the job.
#[derive(Clone)]
pub struct FnExecutor<F> {
    submit: F,
}

/// Use a callable as an executor.
#[inline]
pub fn from_fn<F>(submit: F) -> FnExecutor<F>
where
    F: Fn(Job) + Send + Sync + 'static,
{
    FnExecutor { submit }
}

impl<F> Executor for FnExecutor<F>
where
    F: Fn(Job) + Send + Sync + 'static,
{
    #[inline]
    fn execute(
        &self,
        job: Job,
    ) {
        (self.submit)(job)
    }
}

impl<F> fmt::Debug for FnExecutor<F> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("FnExecutor").finish_non_exhaustive()
    }
}

/// Scheduler whose submission returns a future of the job's completion.
pub trait TwoWayExecutor: Send + Sync + 'static {
    /// Submit `job` and observe its completion.
    fn twoway_execute(
        &self,
        job: Job,
    ) -> Future<()>;
}

/// Uses a [`TwoWayExecutor`] as a plain executor by dropping the completion future.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneWay<E>(pub E);

impl<E> Executor for OneWay<E>
where
    E: TwoWayExecutor,
{
    fn execute(
        &self,
        job: Job,
    ) {
        drop(self.0.twoway_execute(job));
    }
}

/// Run `f` on `executor`.
#[inline]
pub fn execute<E, F>(
    executor: &E,
    f: F,
) where
    E: Executor + ?Sized,
    F: FnOnce() + Send + 'static,
{
    executor.execute(Box::new(f))
}

/// Run `f` on `executor` and return a future of its result.
///
/// A panic inside `f` completes the future with an error.
pub fn spawn<E, F, R>(
    executor: &E,
    f: F,
) -> Future<R>
where
    E: Executor + ?Sized,
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    try_spawn(executor, move || Ok(f()))
}

/// Run a fallible `f` on `executor` and return a future of its outcome.
pub fn try_spawn<E, F, R>(
    executor: &E,
    f: F,
) -> Future<R>
where
    E: Executor + ?Sized,
    F: FnOnce() -> Outcome<R> + Send + 'static,
    R: Send + 'static,
{
    let (future, promise) = make_future_promise_pair();
    executor.execute(Box::new(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(f))
            .unwrap_or_else(|payload| Err(Error::from_panic(payload)));
        promise.set_outcome(outcome);
    }));
    future
}

#[cfg(test)]
mod tests;
