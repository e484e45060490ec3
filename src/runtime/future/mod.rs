//! Promises and futures
//!
//! A [`Promise`] is the one-shot write end of a [`SharedState`]; a [`Future`]
//! (exclusive) or [`SharedFuture`] (clonable) is the read end.
//!
//! ```
//! use promissory::runtime::future::make_future_promise_pair;
//! use promissory::runtime::executor::InlineExecutor;
//!
//! let (future, promise) = make_future_promise_pair::<i32>();
//! let next = future.via(InlineExecutor).then(|v| v + 1);
//! promise.set_value(5);
//! assert_eq!(next.get().unwrap(), 6);
//! ```
//!
//! Consuming operations take `self`, so a future cannot be used after `get`
//! or `share`:
//!
//! ```compile_fail
//! use promissory::runtime::future::make_ready_future;
//!
//! let future = make_ready_future(1);
//! let shared = future.share();
//! let _ = future.get();
//! ```

pub mod continuable;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::runtime::error::{Error, Outcome};
use crate::runtime::executor::Executor;
use crate::runtime::state::SharedState;

pub use continuable::{ContinuableFuture, ContinuableSharedFuture};

/// Create a linked exclusive future and promise.
pub fn make_future_promise_pair<T>() -> (Future<T>, Promise<T>) {
    let state = Arc::new(SharedState::new());
    (
        Future {
            state: Arc::clone(&state),
        },
        Promise { state: Some(state) },
    )
}

/// Create a linked shared future and promise.
pub fn make_shared_future_promise_pair<T>() -> (SharedFuture<T>, Promise<T>) {
    let (future, promise) = make_future_promise_pair();
    (future.share(), promise)
}

/// A future that already holds `value`.
#[inline]
pub fn make_ready_future<T>(value: T) -> Future<T> {
    make_completed_future(Ok(value))
}

/// A future that already holds `error`.
#[inline]
pub fn make_error_future<T>(error: impl Into<Error>) -> Future<T> {
    make_completed_future(Err(error.into()))
}

/// A future that already holds `outcome`.
pub fn make_completed_future<T>(outcome: Outcome<T>) -> Future<T> {
    Future {
        state: Arc::new(SharedState::ready(outcome)),
    }
}

/// A shared future that already holds `value`.
#[inline]
pub fn make_ready_shared_future<T>(value: T) -> SharedFuture<T> {
    make_ready_future(value).share()
}

/// A shared future that already holds `error`.
#[inline]
pub fn make_error_shared_future<T>(error: impl Into<Error>) -> SharedFuture<T> {
    make_error_future(error).share()
}

/// One-shot write handle.
///
/// Dropping a promise that was never fulfilled stores a broken-promise error,
/// so waiters and continuations never hang on it.
pub struct Promise<T> {
    state: Option<Arc<SharedState<T>>>,
}

impl<T> Promise<T> {
    /// Fulfill with a value.
    #[inline]
    pub fn set_value(
        self,
        value: T,
    ) {
        self.set_outcome(Ok(value));
    }

    /// Fail with an error.
    #[inline]
    pub fn set_error(
        self,
        error: impl Into<Error>,
    ) {
        self.set_outcome(Err(error.into()));
    }

    /// Complete with an outcome.
    pub fn set_outcome(
        mut self,
        outcome: Outcome<T>,
    ) {
        if let Some(state) = self.state.take() {
            state.set_outcome(outcome);
        }
    }

    /// True once the linked state holds a result.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state.as_ref().map_or(true, |state| state.is_ready())
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            warn!("promise dropped without a result");
            state.set_outcome(Err(Error::broken_promise()));
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Promise").field("state", &self.state).finish()
    }
}

/// Exclusive read handle.
///
/// Dropping a future detaches it; the producer still runs to completion.
#[must_use = "futures carry a value or an error that should be observed"]
pub struct Future<T> {
    state: Arc<SharedState<T>>,
}

impl<T> Future<T> {
    /// Non-blocking completion check.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Block until the result exists.
    #[inline]
    pub fn wait(&self) {
        self.state.wait()
    }

    /// Block until the result exists or `timeout` elapses.
    #[inline]
    pub fn wait_for(
        &self,
        timeout: Duration,
    ) -> bool {
        self.state.wait_for(timeout)
    }

    /// Block and move the result out.
    #[inline]
    pub fn get(self) -> Outcome<T> {
        self.state.take()
    }

    /// Convert into a clonable [`SharedFuture`] over the same state.
    #[inline]
    pub fn share(self) -> SharedFuture<T> {
        SharedFuture { state: self.state }
    }

    /// Bind an executor for continuations.
    #[inline]
    pub fn via<E>(
        self,
        executor: E,
    ) -> ContinuableFuture<T, E>
    where
        E: Executor + Clone,
    {
        ContinuableFuture::new(self, executor)
    }

    pub(crate) fn into_state(self) -> Arc<SharedState<T>> {
        self.state
    }
}

impl<T: Send + 'static> Future<Future<T>> {
    /// Collapse a future of a future into one future.
    ///
    /// An error of the outer future is forwarded as-is.
    pub fn flatten(self) -> Future<T> {
        let (future, promise) = make_future_promise_pair();
        let outer = self.state;
        let reader = Arc::clone(&outer);
        outer.set_continuation(move || match reader.take() {
            Ok(inner) => {
                let inner = inner.state;
                let source = Arc::clone(&inner);
                inner.set_continuation(move || promise.set_outcome(source.take()));
            },
            Err(error) => promise.set_error(error),
        });
        future
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Future").field("state", &self.state).finish()
    }
}

/// Clonable read handle; every copy observes the same result.
#[must_use = "futures carry a value or an error that should be observed"]
pub struct SharedFuture<T> {
    state: Arc<SharedState<T>>,
}

impl<T> SharedFuture<T> {
    /// Non-blocking completion check.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Block until the result exists.
    #[inline]
    pub fn wait(&self) {
        self.state.wait()
    }

    /// Block until the result exists or `timeout` elapses.
    #[inline]
    pub fn wait_for(
        &self,
        timeout: Duration,
    ) -> bool {
        self.state.wait_for(timeout)
    }

    /// Block and borrow the stored result.
    ///
    /// Copies may live on different threads, so lending needs `T: Sync`:
    ///
    /// ```compile_fail
    /// use std::cell::Cell;
    /// use promissory::prelude::*;
    ///
    /// let shared = make_ready_shared_future(Cell::new(1));
    /// let _ = shared.outcome();
    /// ```
    #[inline]
    pub fn outcome(&self) -> Arc<Outcome<T>>
    where
        T: Sync,
    {
        self.state.shared()
    }

    /// Block and clone the stored result.
    #[inline]
    pub fn get(&self) -> Outcome<T>
    where
        T: Clone + Sync,
    {
        self.state.get()
    }

    /// Bind an executor for continuations.
    #[inline]
    pub fn via<E>(
        self,
        executor: E,
    ) -> ContinuableSharedFuture<T, E>
    where
        E: Executor + Clone,
    {
        ContinuableSharedFuture::new(self, executor)
    }

    /// True if both handles observe the same state.
    #[inline]
    pub fn ptr_eq(
        &self,
        other: &Self,
    ) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub(crate) fn state(&self) -> &Arc<SharedState<T>> {
        &self.state
    }
}

impl<T> Clone for SharedFuture<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for SharedFuture<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SharedFuture")
            .field("state", &self.state)
            .finish()
    }
}
