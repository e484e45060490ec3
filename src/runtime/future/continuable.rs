//! Futures bound to an executor
//!
//! [`ContinuableFuture`] and [`ContinuableSharedFuture`] pair a future with the
//! executor its continuations run on. Each `then` returns a new continuable
//! future bound to the same executor, so chains read left to right.

use std::time::Duration;

use crate::runtime::continuation::{self, Handler, OnValue};
use crate::runtime::error::Outcome;
use crate::runtime::executor::Executor;
use crate::runtime::future::{Future, SharedFuture};

/// An exclusive future plus the executor for its continuation.
#[must_use = "futures carry a value or an error that should be observed"]
#[derive(Debug)]
pub struct ContinuableFuture<T, E> {
    future: Future<T>,
    executor: E,
}

impl<T, E> ContinuableFuture<T, E>
where
    E: Executor + Clone,
{
    /// Bind `executor` to `future`.
    #[inline]
    pub fn new(
        future: Future<T>,
        executor: E,
    ) -> Self {
        Self { future, executor }
    }

    /// Attach a value handler.
    ///
    /// An upstream error skips `f` and flows to the returned future.
    pub fn then<F, U>(
        self,
        f: F,
    ) -> ContinuableFuture<U, E>
    where
        T: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
        U: Send + 'static,
    {
        self.then_with(continuation::value(f))
    }

    /// Attach a handler of any shape, see [`crate::runtime::continuation`].
    pub fn then_with<H>(
        self,
        handler: H,
    ) -> ContinuableFuture<H::Output, E>
    where
        T: Send + 'static,
        H: Handler<T>,
    {
        let future = continuation::bind_exclusive(
            self.future.into_state(),
            self.executor.clone(),
            handler,
        );
        ContinuableFuture::new(future, self.executor)
    }

    /// Rebind to another executor.
    #[inline]
    pub fn via<E2>(
        self,
        executor: E2,
    ) -> ContinuableFuture<T, E2>
    where
        E2: Executor + Clone,
    {
        ContinuableFuture::new(self.future, executor)
    }

    /// Convert into a shared continuable future on the same executor.
    #[inline]
    pub fn share(self) -> ContinuableSharedFuture<T, E> {
        ContinuableSharedFuture::new(self.future.share(), self.executor)
    }

    /// Block and move the result out.
    #[inline]
    pub fn get(self) -> Outcome<T> {
        self.future.get()
    }

    /// Non-blocking completion check.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.future.is_ready()
    }

    /// Block until the result exists.
    #[inline]
    pub fn wait(&self) {
        self.future.wait()
    }

    /// Block until the result exists or `timeout` elapses.
    #[inline]
    pub fn wait_for(
        &self,
        timeout: Duration,
    ) -> bool {
        self.future.wait_for(timeout)
    }

    /// The bound executor.
    #[inline]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Drop the executor binding.
    #[inline]
    pub fn into_inner(self) -> Future<T> {
        self.future
    }
}

impl<T, E> ContinuableFuture<Future<T>, E>
where
    T: Send + 'static,
    E: Executor + Clone,
{
    /// Collapse a future of a future, keeping the executor binding.
    pub fn flatten(self) -> ContinuableFuture<T, E> {
        ContinuableFuture::new(self.future.flatten(), self.executor)
    }
}

/// A shared future plus the executor for its continuations.
#[must_use = "futures carry a value or an error that should be observed"]
#[derive(Debug)]
pub struct ContinuableSharedFuture<T, E> {
    future: SharedFuture<T>,
    executor: E,
}

impl<T, E: Clone> Clone for ContinuableSharedFuture<T, E> {
    fn clone(&self) -> Self {
        Self {
            future: self.future.clone(),
            executor: self.executor.clone(),
        }
    }
}

impl<T, E> ContinuableSharedFuture<T, E>
where
    E: Executor + Clone,
{
    /// Bind `executor` to `future`.
    #[inline]
    pub fn new(
        future: SharedFuture<T>,
        executor: E,
    ) -> Self {
        Self { future, executor }
    }

    /// Attach a value handler reading the shared value by reference.
    pub fn then<F, U>(
        &self,
        f: F,
    ) -> ContinuableFuture<U, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&T) -> U + Send + 'static,
        U: Send + 'static,
    {
        self.then_with::<OnValue<F>, U>(continuation::value(f))
    }

    /// Attach a handler of any shape; the value is lent as `&T`.
    pub fn then_with<H, U>(
        &self,
        handler: H,
    ) -> ContinuableFuture<U, E>
    where
        T: Send + Sync + 'static,
        H: for<'a> Handler<&'a T, Output = U>,
        U: Send + 'static,
    {
        let future = continuation::bind_shared(
            self.future.state().clone(),
            self.executor.clone(),
            handler,
        );
        ContinuableFuture::new(future, self.executor.clone())
    }

    /// Rebind to another executor.
    #[inline]
    pub fn via<E2>(
        self,
        executor: E2,
    ) -> ContinuableSharedFuture<T, E2>
    where
        E2: Executor + Clone,
    {
        ContinuableSharedFuture::new(self.future, executor)
    }

    /// Block and clone the result.
    #[inline]
    pub fn get(&self) -> Outcome<T>
    where
        T: Clone + Sync,
    {
        self.future.get()
    }

    /// Non-blocking completion check.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.future.is_ready()
    }

    /// Block until the result exists.
    #[inline]
    pub fn wait(&self) {
        self.future.wait()
    }

    /// Block until the result exists or `timeout` elapses.
    #[inline]
    pub fn wait_for(
        &self,
        timeout: Duration,
    ) -> bool {
        self.future.wait_for(timeout)
    }

    /// The bound executor.
    #[inline]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Drop the executor binding.
    #[inline]
    pub fn into_inner(self) -> SharedFuture<T> {
        self.future
    }
}
