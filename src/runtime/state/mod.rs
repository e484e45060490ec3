//! Shared result cell
//!
//! A [`SharedState`] sits between one [`Promise`](crate::runtime::future::Promise)
//! and its future(s). It holds the eventual [`Outcome`] and the callbacks that
//! are waiting for it.
//!
//! # Guarantees
//!
//! - The outcome is written at most once; a second write panics.
//! - Every registered continuation runs exactly once: immediately when it is
//!   registered after completion, otherwise right after the write.
//! - Continuations always run with the internal lock released.
//! - A panicking continuation is logged and does not stop the others.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;
use tracing::error;

use crate::runtime::error::{Error, Outcome};

/// Callback run once the outcome exists.
pub type Continuation = Box<dyn FnOnce() + Send + 'static>;

fn run_continuation(continuation: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(continuation)) {
        let error = Error::from_panic(payload);
        error!(%error, "continuation panicked");
    }
}

struct Slot<T> {
    /// Stored outcome; `None` before completion and after a move-out.
    outcome: Option<Arc<Outcome<T>>>,
    /// Set once by the first write, never cleared.
    completed: bool,
    /// Pending callbacks, drained by the write.
    continuations: SmallVec<[Continuation; 1]>,
}

/// Mutex/condition guarded result cell shared by a promise and its futures.
pub struct SharedState<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> SharedState<T> {
    /// Create an empty state.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                outcome: None,
                completed: false,
                continuations: SmallVec::new(),
            }),
            ready: Condvar::new(),
        }
    }

    /// Create a state that is already complete.
    pub fn ready(outcome: Outcome<T>) -> Self {
        Self {
            slot: Mutex::new(Slot {
                outcome: Some(Arc::new(outcome)),
                completed: true,
                continuations: SmallVec::new(),
            }),
            ready: Condvar::new(),
        }
    }

    /// Non-blocking completion check.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.slot.lock().completed
    }

    /// Block until the outcome exists.
    pub fn wait(&self) {
        let mut slot = self.slot.lock();
        while !slot.completed {
            self.ready.wait(&mut slot);
        }
    }

    /// Block until the outcome exists or `timeout` elapses.
    ///
    /// Returns `true` if the outcome is available.
    pub fn wait_for(
        &self,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        while !slot.completed {
            if self.ready.wait_until(&mut slot, deadline).timed_out() {
                return slot.completed;
            }
        }
        true
    }

    /// Store a value.
    #[inline]
    pub fn set_value(
        &self,
        value: T,
    ) {
        self.set_outcome(Ok(value));
    }

    /// Store an error.
    #[inline]
    pub fn set_error(
        &self,
        error: impl Into<Error>,
    ) {
        self.set_outcome(Err(error.into()));
    }

    /// Store a complete outcome and run the pending continuations.
    ///
    /// # Panics
    ///
    /// Panics if an outcome was already stored.
    pub fn set_outcome(
        &self,
        outcome: Outcome<T>,
    ) {
        let continuations = {
            let mut slot = self.slot.lock();
            assert!(!slot.completed, "shared state result already set");
            slot.outcome = Some(Arc::new(outcome));
            slot.completed = true;
            std::mem::take(&mut slot.continuations)
        };
        self.ready.notify_all();

        for continuation in continuations {
            run_continuation(continuation);
        }
    }

    /// Register a callback for completion.
    ///
    /// Runs `continuation` on the calling thread right away when the outcome
    /// already exists.
    pub fn set_continuation<F>(
        &self,
        continuation: F,
    ) where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = self.slot.lock();
        if slot.completed {
            drop(slot);
            run_continuation(continuation);
        } else {
            slot.continuations.push(Box::new(continuation));
        }
    }

    /// Number of continuations still waiting for the outcome.
    pub fn pending_continuations(&self) -> usize {
        self.slot.lock().continuations.len()
    }

    /// Block, then move the outcome out.
    ///
    /// # Panics
    ///
    /// Panics if the outcome was already taken or is held by shared readers.
    pub fn take(&self) -> Outcome<T> {
        let outcome = {
            let mut slot = self.slot.lock();
            while !slot.completed {
                self.ready.wait(&mut slot);
            }
            slot.outcome.take()
        };
        let outcome = outcome.unwrap_or_else(|| panic!("shared state result already consumed"));
        Arc::try_unwrap(outcome)
            .unwrap_or_else(|_| panic!("shared state result is held by shared readers"))
    }

    /// Block, then borrow the outcome for shared reading.
    ///
    /// # Panics
    ///
    /// Panics if the outcome was moved out by [`SharedState::take`].
    pub fn shared(&self) -> Arc<Outcome<T>>
    where
        T: Sync,
    {
        let mut slot = self.slot.lock();
        while !slot.completed {
            self.ready.wait(&mut slot);
        }
        match &slot.outcome {
            Some(outcome) => Arc::clone(outcome),
            None => panic!("shared state result already consumed"),
        }
    }

    /// Block, then clone the outcome.
    pub fn get(&self) -> Outcome<T>
    where
        T: Clone + Sync,
    {
        (*self.shared()).clone()
    }
}

// SAFETY: a `T` leaves the cell either by move through `take`, which needs
// only `T: Send`, or as a shared `Arc` through `shared`, which requires
// `T: Sync`. Without `T: Sync` at most one `Arc` to the outcome ever exists.
// `SharedFuture::outcome` carries a `compile_fail` doctest for that bound.
unsafe impl<T: Send> Send for SharedState<T> {}
unsafe impl<T: Send> Sync for SharedState<T> {}

impl<T> Default for SharedState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SharedState<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("SharedState")
            .field("completed", &slot.completed)
            .field("available", &slot.outcome.is_some())
            .field("continuations", &slot.continuations.len())
            .finish()
    }
}
