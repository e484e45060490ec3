//! Runtime system
//!
//! This module contains the result cells, promises and futures, the
//! continuation binder, executors and the worker pool.

pub mod continuation;
pub mod error;
pub mod executor;
pub mod future;
pub mod scheduler;
pub mod state;

use std::fmt;

use tracing::debug;

use crate::runtime::error::PoolError;
use crate::runtime::executor::{InlineExecutor, Job};
use crate::runtime::future::Future;
use crate::runtime::scheduler::{PoolExecutor, PoolState, ThreadPool};
use crate::util::config::RuntimeConfig;

/// Owner of the concurrent executor.
///
/// Construct one explicitly and pass it (or its executors) to the code that
/// needs background work. Shutting it down drains every queued job.
pub struct Runtime {
    pool: ThreadPool,
}

impl Runtime {
    /// Build a runtime from configuration.
    pub fn new(config: &RuntimeConfig) -> Result<Self, PoolError> {
        let pool = ThreadPool::with_config(&config.pool)?;
        debug!(num_threads = pool.num_threads(), "runtime started");
        Ok(Self { pool })
    }

    /// Build a runtime with `num_threads` workers and default settings otherwise.
    pub fn with_threads(num_threads: usize) -> Result<Self, PoolError> {
        Ok(Self {
            pool: ThreadPool::with_threads(num_threads)?,
        })
    }

    /// Executor running jobs on the worker pool.
    #[inline]
    pub fn executor(&self) -> PoolExecutor {
        self.pool.executor()
    }

    /// Executor running jobs on the submitting thread.
    #[inline]
    pub fn inline(&self) -> InlineExecutor {
        InlineExecutor
    }

    /// Run `f` on the worker pool and return a future of its result.
    pub fn spawn<F, R>(
        &self,
        f: F,
    ) -> Future<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        executor::spawn(&self.pool.executor(), f)
    }

    /// Submit a raw job on the worker pool.
    pub fn execute(
        &self,
        job: Job,
    ) {
        executor::Executor::execute(&self.pool.executor(), job)
    }

    /// The underlying pool.
    #[inline]
    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    /// Drain queued work, including continuations of running jobs, and join the workers.
    pub fn shutdown(mut self) {
        self.pool.join();
        debug!("runtime shut down");
    }

    /// True until shutdown begins.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.pool.state() == PoolState::Run
    }
}

impl fmt::Debug for Runtime {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Runtime").field("pool", &self.pool).finish()
    }
}
