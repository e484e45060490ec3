//! Continuation binder
//!
//! Adapts the different handler shapes accepted by `then_with` to one
//! invocation contract, [`Handler::call`], and wires a handler between a
//! source state and a fresh downstream promise.
//!
//! | Outcome | value | error | done | result |
//! |---------|-------|-------|------|--------|
//! | `Ok`    | `f(v)` | skipped, `Ok(())` | `f()` | `f(Ok(v))` |
//! | `Err`   | skipped, error forwarded | `f(&e)`, error forwarded | skipped, error forwarded | `f(Err(e))` |
//!
//! Exclusive futures deliver the value by move (`A = T`); shared futures lend
//! it (`A = &T`) so that concurrent continuations read a single stored result.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use crate::runtime::error::{Error, Outcome};
use crate::runtime::executor::Executor;
use crate::runtime::future::{make_future_promise_pair, Future};
use crate::runtime::state::SharedState;

/// A continuation handler receiving an input of type `A`.
pub trait Handler<A>: Send + 'static {
    /// Value type of the downstream future.
    type Output: Send + 'static;

    /// Consume the upstream outcome and produce the downstream one.
    fn call(
        self,
        input: Outcome<A>,
    ) -> Outcome<Self::Output>;
}

/// Handler invoked with the success value only.
#[derive(Debug, Clone, Copy)]
pub struct OnValue<F>(F);

/// Handler invoked with the captured error only; the error still flows downstream.
#[derive(Debug, Clone, Copy)]
pub struct OnError<F>(F);

/// Handler invoked on success without the value.
#[derive(Debug, Clone, Copy)]
pub struct OnDone<F>(F);

/// Handler invoked with the full outcome; its return value flows downstream.
#[derive(Debug, Clone, Copy)]
pub struct OnResult<F>(F);

/// Build a value handler.
#[inline]
pub fn value<F>(f: F) -> OnValue<F> {
    OnValue(f)
}

/// Build an error handler.
#[inline]
pub fn error<F>(f: F) -> OnError<F> {
    OnError(f)
}

/// Build a "done" handler.
#[inline]
pub fn done<F>(f: F) -> OnDone<F> {
    OnDone(f)
}

/// Build a full-outcome handler.
#[inline]
pub fn result<F>(f: F) -> OnResult<F> {
    OnResult(f)
}

impl<A, F, U> Handler<A> for OnValue<F>
where
    F: FnOnce(A) -> U + Send + 'static,
    U: Send + 'static,
{
    type Output = U;

    fn call(
        self,
        input: Outcome<A>,
    ) -> Outcome<U> {
        input.map(self.0)
    }
}

impl<A, F> Handler<A> for OnError<F>
where
    F: FnOnce(&Error) + Send + 'static,
{
    type Output = ();

    fn call(
        self,
        input: Outcome<A>,
    ) -> Outcome<()> {
        match input {
            Ok(_) => Ok(()),
            Err(error) => {
                (self.0)(&error);
                Err(error)
            },
        }
    }
}

impl<A, F, U> Handler<A> for OnDone<F>
where
    F: FnOnce() -> U + Send + 'static,
    U: Send + 'static,
{
    type Output = U;

    fn call(
        self,
        input: Outcome<A>,
    ) -> Outcome<U> {
        input.map(|_| (self.0)())
    }
}

impl<A, F, U> Handler<A> for OnResult<F>
where
    F: FnOnce(Outcome<A>) -> Outcome<U> + Send + 'static,
    U: Send + 'static,
{
    type Output = U;

    fn call(
        self,
        input: Outcome<A>,
    ) -> Outcome<U> {
        (self.0)(input)
    }
}

/// Invoke a handler, turning a panic into an error outcome.
pub fn invoke<A, H>(
    handler: H,
    input: Outcome<A>,
) -> Outcome<H::Output>
where
    H: Handler<A>,
{
    panic::catch_unwind(AssertUnwindSafe(move || handler.call(input))).unwrap_or_else(|payload| {
        let error = Error::from_panic(payload);
        warn!(%error, "continuation panicked");
        Err(error)
    })
}

/// Chain `handler` after `source`, moving the value into the handler.
pub(crate) fn bind_exclusive<T, H, E>(
    source: Arc<SharedState<T>>,
    executor: E,
    handler: H,
) -> Future<H::Output>
where
    T: Send + 'static,
    H: Handler<T>,
    E: Executor,
{
    let (future, promise) = make_future_promise_pair();
    let reader = Arc::clone(&source);
    source.set_continuation(move || {
        executor.execute(Box::new(move || {
            let input = reader.take();
            promise.set_outcome(invoke(handler, input));
        }));
    });
    future
}

/// Chain `handler` after `source`, lending the stored value to the handler.
pub(crate) fn bind_shared<T, H, U, E>(
    source: Arc<SharedState<T>>,
    executor: E,
    handler: H,
) -> Future<U>
where
    T: Send + Sync + 'static,
    H: for<'a> Handler<&'a T, Output = U>,
    U: Send + 'static,
    E: Executor,
{
    let (future, promise) = make_future_promise_pair();
    let reader = Arc::clone(&source);
    source.set_continuation(move || {
        executor.execute(Box::new(move || {
            let shared = reader.shared();
            let input = match &*shared {
                Ok(value) => Ok(value),
                Err(error) => Err(error.clone()),
            };
            promise.set_outcome(invoke(handler, input));
        }));
    });
    future
}
