//! Fixed-size worker thread pool
//!
//! Workers drain a shared [`PriorityTaskQueue`]. The pool moves through a
//! one-way lifecycle:
//!
//! ```text
//! Run ──join()──> Stop   queued work is drained, then workers exit
//!  └───kill()───> Kill   workers exit at once, queued work is discarded
//! ```
//!
//! While stopping, submissions are still accepted as long as a worker is
//! alive: a continuation is only queued when the task before it finishes.
//!
//! Dropping a pool forces `Kill`, so it never hangs on outstanding work.

pub mod queue;
pub mod task;

pub use queue::PriorityTaskQueue;
pub use task::{Task, TaskId, TaskIdGenerator, TaskPriority};

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace, warn};

use crate::runtime::error::{Error, PoolError};
use crate::runtime::executor::{Executor, Job};
use crate::util::config::PoolConfig;

/// Pool lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Accepting and running tasks.
    Run,
    /// Draining the queue; new tasks accepted until the last worker exits.
    Stop,
    /// Exiting; queued tasks discarded.
    Kill,
}

/// Pool statistics.
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Total tasks accepted.
    pub tasks_queued: AtomicUsize,
    /// Total tasks run to completion (including panicked ones).
    pub tasks_completed: AtomicUsize,
    /// Total tasks that panicked.
    pub tasks_panicked: AtomicUsize,
    /// Total queued tasks discarded by `Kill`.
    pub tasks_discarded: AtomicUsize,
    /// Total submissions refused after shutdown began.
    pub tasks_rejected: AtomicUsize,
}

impl PoolStats {
    /// Record an accepted task.
    #[inline]
    pub fn record_queued(&self) {
        self.tasks_queued.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a finished task.
    #[inline]
    pub fn record_completed(
        &self,
        panicked: bool,
    ) {
        self.tasks_completed.fetch_add(1, Ordering::SeqCst);
        if panicked {
            self.tasks_panicked.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Record discarded tasks.
    #[inline]
    pub fn record_discarded(
        &self,
        count: usize,
    ) {
        self.tasks_discarded.fetch_add(count, Ordering::SeqCst);
    }

    /// Record a refused submission.
    #[inline]
    pub fn record_rejected(&self) {
        self.tasks_rejected.fetch_add(1, Ordering::SeqCst);
    }

    /// Tasks accepted but not yet finished or discarded.
    pub fn outstanding(&self) -> usize {
        let queued = self.tasks_queued.load(Ordering::SeqCst);
        let done = self.tasks_completed.load(Ordering::SeqCst)
            + self.tasks_discarded.load(Ordering::SeqCst);
        queued.saturating_sub(done)
    }
}

/// State guarded by the pool mutex.
struct Inner {
    queue: PriorityTaskQueue,
    state: PoolState,
    /// Workers that have not left their loop.
    live_workers: usize,
}

impl Inner {
    fn accepts(&self) -> bool {
        match self.state {
            PoolState::Run => true,
            PoolState::Stop => self.live_workers > 0,
            PoolState::Kill => false,
        }
    }
}

/// Shared between the pool handle, its workers and its executors.
struct Shared {
    inner: Mutex<Inner>,
    available: Condvar,
    stats: PoolStats,
}

impl Shared {
    /// Queue `job`, or hand it back if no worker will ever run it.
    fn submit(
        &self,
        job: Job,
        priority: TaskPriority,
    ) -> Result<TaskId, Job> {
        let mut inner = self.inner.lock();
        if !inner.accepts() {
            drop(inner);
            self.stats.record_rejected();
            return Err(job);
        }
        let id = inner.queue.push(job, priority);
        drop(inner);

        self.stats.record_queued();
        self.available.notify_one();
        trace!(task_id = id.inner(), %priority, "task queued");
        Ok(id)
    }

    /// Move to `target` and wake every worker.
    ///
    /// `Kill` overrides `Stop`; nothing returns to `Run`.
    fn signal(
        &self,
        target: PoolState,
    ) {
        let discarded = {
            let mut inner = self.inner.lock();
            match (inner.state, target) {
                (PoolState::Run, _) | (PoolState::Stop, PoolState::Kill) => inner.state = target,
                _ => {},
            }
            if inner.state == PoolState::Kill {
                inner.queue.drain()
            } else {
                Vec::new()
            }
        };
        self.available.notify_all();

        if !discarded.is_empty() {
            warn!(discarded = discarded.len(), "pool killed with queued tasks");
            self.stats.record_discarded(discarded.len());
        }
        // Dropped outside the lock: a job may own a promise whose drop runs continuations.
        drop(discarded);
    }

    fn state(&self) -> PoolState {
        self.inner.lock().state
    }

    /// Worker thread main loop.
    fn worker_loop(
        &self,
        worker_id: usize,
    ) {
        debug!(worker_id, "worker started");
        loop {
            let task = {
                let mut inner = self.inner.lock();
                loop {
                    let exit = match inner.state {
                        PoolState::Kill => true,
                        PoolState::Stop => inner.queue.is_empty(),
                        PoolState::Run => false,
                    };
                    if exit {
                        inner.live_workers -= 1;
                        break None;
                    }
                    if let Some(task) = inner.queue.pop() {
                        break Some(task);
                    }
                    self.available.wait(&mut inner);
                }
            };

            let Some(task) = task else {
                break;
            };
            self.run_task(worker_id, task);
        }
        debug!(worker_id, "worker exited");
    }

    /// Execute a task outside the lock.
    fn run_task(
        &self,
        worker_id: usize,
        task: Task,
    ) {
        let task_id = task.id();
        trace!(worker_id, task_id = task_id.inner(), "task started");

        let job = task.into_job();
        let panicked = match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(()) => false,
            Err(payload) => {
                let error = Error::from_panic(payload);
                error!(worker_id, task_id = task_id.inner(), %error, "task panicked");
                true
            },
        };
        self.stats.record_completed(panicked);
    }
}

/// Fixed set of worker threads draining a priority queue.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<thread::JoinHandle<()>>,
    num_threads: usize,
    default_priority: TaskPriority,
}

impl ThreadPool {
    /// Create a pool with one worker per hardware thread.
    #[inline]
    pub fn new() -> Result<Self, PoolError> {
        Self::with_config(&PoolConfig::default())
    }

    /// Create a pool with `num_threads` workers (at least one).
    pub fn with_threads(num_threads: usize) -> Result<Self, PoolError> {
        Self::with_config(&PoolConfig {
            num_threads: Some(num_threads),
            ..PoolConfig::default()
        })
    }

    /// Create a pool from configuration.
    pub fn with_config(config: &PoolConfig) -> Result<Self, PoolError> {
        let num_threads = config.resolved_threads();
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                queue: PriorityTaskQueue::new(),
                state: PoolState::Run,
                live_workers: 0,
            }),
            available: Condvar::new(),
            stats: PoolStats::default(),
        });

        let mut pool = Self {
            shared,
            workers: Vec::with_capacity(num_threads),
            num_threads,
            default_priority: TaskPriority(config.default_priority),
        };

        for worker_id in 0..num_threads {
            let shared = Arc::clone(&pool.shared);
            let mut builder =
                thread::Builder::new().name(format!("{}-{}", config.thread_name, worker_id));
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }
            pool.shared.inner.lock().live_workers += 1;
            // On failure `pool` is dropped here, which kills and joins the started workers.
            let worker = match builder.spawn(move || shared.worker_loop(worker_id)) {
                Ok(worker) => worker,
                Err(err) => {
                    pool.shared.inner.lock().live_workers -= 1;
                    return Err(err.into());
                },
            };
            pool.workers.push(worker);
        }

        debug!(num_threads, "thread pool started");
        Ok(pool)
    }

    /// Queue `f` to run on a worker.
    pub fn queue_task<F>(
        &self,
        f: F,
        priority: impl Into<TaskPriority>,
    ) -> Result<TaskId, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        // A rejected job is dropped here, after the pool lock is released.
        self.shared
            .submit(Box::new(f), priority.into())
            .map_err(|_job| PoolError::ShutDown)
    }

    /// Executor submitting to this pool at the default priority.
    #[inline]
    pub fn executor(&self) -> PoolExecutor {
        PoolExecutor {
            shared: Arc::clone(&self.shared),
            priority: self.default_priority,
        }
    }

    /// Run everything queued, including work queued by running tasks, then join the workers.
    ///
    /// Submissions are refused once the last worker has exited.
    pub fn join(&mut self) {
        self.shared.signal(PoolState::Stop);
        self.join_workers();
    }

    /// Stop at once, discarding queued tasks, then join the workers.
    pub fn kill(&mut self) {
        self.shared.signal(PoolState::Kill);
        self.join_workers();
    }

    fn join_workers(&mut self) {
        let current = thread::current().id();
        for worker in self.workers.drain(..) {
            if worker.thread().id() == current {
                warn!("thread pool shut down from one of its own workers; not joining it");
                continue;
            }
            if worker.join().is_err() {
                error!("worker thread panicked");
            }
        }
        debug!(state = ?self.shared.state(), "thread pool joined");
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> PoolState {
        self.shared.state()
    }

    /// Number of worker threads.
    #[inline]
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Number of workers still running their loop.
    #[inline]
    pub fn live_workers(&self) -> usize {
        self.shared.inner.lock().live_workers
    }

    /// Number of queued tasks not yet claimed by a worker.
    #[inline]
    pub fn pending(&self) -> usize {
        self.shared.inner.lock().queue.len()
    }

    /// Get statistics.
    #[inline]
    pub fn stats(&self) -> &PoolStats {
        &self.shared.stats
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.kill();
        }
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_threads", &self.num_threads)
            .field("state", &self.state())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Lightweight executor bound to a [`ThreadPool`].
///
/// Jobs submitted once the pool can no longer run them are dropped.
#[derive(Clone)]
pub struct PoolExecutor {
    shared: Arc<Shared>,
    priority: TaskPriority,
}

impl PoolExecutor {
    /// Same pool, different priority for submitted jobs.
    #[inline]
    pub fn with_priority(
        &self,
        priority: impl Into<TaskPriority>,
    ) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            priority: priority.into(),
        }
    }

    /// Priority used for submitted jobs.
    #[inline]
    pub fn priority(&self) -> TaskPriority {
        self.priority
    }
}

impl Executor for PoolExecutor {
    fn execute(
        &self,
        job: Job,
    ) {
        if let Err(job) = self.shared.submit(job, self.priority) {
            debug!("pool no longer running; dropping job");
            drop(job);
        }
    }
}

impl fmt::Debug for PoolExecutor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("PoolExecutor")
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
