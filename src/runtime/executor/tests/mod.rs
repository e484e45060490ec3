//! Executor 单元测试
//!
//! 测试内联执行器、闭包适配、双向调度器适配以及 spawn 入口

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::runtime::error::{Error, RuntimeError};
use crate::runtime::executor::{
    execute, from_fn, spawn, try_spawn, Executor, InlineExecutor, Job, OneWay, TwoWayExecutor,
};
use crate::runtime::future::{make_future_promise_pair, Future};

/// Queues jobs until the test runs them by hand.
#[derive(Default)]
struct ManualExecutor {
    jobs: Mutex<Vec<Job>>,
}

impl ManualExecutor {
    fn run_all(&self) -> usize {
        let jobs: Vec<Job> = std::mem::take(&mut *self.jobs.lock());
        let count = jobs.len();
        for job in jobs {
            job();
        }
        count
    }
}

impl Executor for ManualExecutor {
    fn execute(
        &self,
        job: Job,
    ) {
        self.jobs.lock().push(job);
    }
}

/// Runs each job on a fresh thread and reports its completion.
struct ThreadPerJob;

impl TwoWayExecutor for ThreadPerJob {
    fn twoway_execute(
        &self,
        job: Job,
    ) -> Future<()> {
        let (future, promise) = make_future_promise_pair();
        thread::spawn(move || {
            job();
            promise.set_value(());
        });
        future
    }
}

#[cfg(test)]
mod inline_tests {
    use super::*;

    #[test]
    fn test_inline_runs_synchronously() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        execute(&InlineExecutor, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_spawn_inline_is_ready() {
        let future = spawn(&InlineExecutor, || 6 * 7);
        assert!(future.is_ready());
        assert_eq!(future.get().unwrap(), 42);
    }
}

#[cfg(test)]
mod adapter_tests {
    use super::*;

    #[test]
    fn test_from_fn_executor() {
        let submitted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&submitted);
        let executor = from_fn(move |job: Job| {
            counter.fetch_add(1, Ordering::SeqCst);
            job();
        });

        let future = spawn(&executor, || "ran");
        assert_eq!(future.get().unwrap(), "ran");
        assert_eq!(submitted.load(Ordering::SeqCst), 1);
        assert!(format!("{:?}", executor).contains("FnExecutor"));
    }

    #[test]
    fn test_two_way_executor_through_one_way() {
        let executor = OneWay(ThreadPerJob);
        let caller = thread::current().id();
        let worker = spawn(&executor, || thread::current().id()).get().unwrap();
        assert_ne!(worker, caller);
    }

    #[test]
    fn test_dyn_executor() {
        let executor: Arc<dyn Executor> = Arc::new(InlineExecutor);
        assert_eq!(spawn(&executor, || 1).get().unwrap(), 1);

        let boxed: Box<dyn Executor> = Box::new(InlineExecutor);
        assert_eq!(spawn(&*boxed, || 2).get().unwrap(), 2);
    }

    #[test]
    fn test_deferred_executor_runs_later() {
        let executor = Arc::new(ManualExecutor::default());
        let future = spawn(&executor, || 5);
        assert!(!future.is_ready());

        assert_eq!(executor.run_all(), 1);
        assert_eq!(future.get().unwrap(), 5);
    }

    #[test]
    fn test_dropped_job_breaks_promise() {
        let executor = from_fn(|job: Job| drop(job));
        let future = spawn(&executor, || 1);
        assert!(future.get().unwrap_err().is_broken_promise());
    }
}

#[cfg(test)]
mod spawn_tests {
    use super::*;

    #[test]
    fn test_try_spawn_error() {
        let future = try_spawn::<_, _, i32>(&InlineExecutor, || {
            Err(Error::new(RuntimeError::Rejected("quota".to_string())))
        });
        assert_eq!(
            future.get().unwrap_err().runtime_error(),
            Some(&RuntimeError::Rejected("quota".to_string()))
        );
    }

    #[test]
    fn test_try_spawn_question_mark() {
        let future = try_spawn(&InlineExecutor, || Ok("12".parse::<i32>()? + 1));
        assert_eq!(future.get().unwrap(), 13);
    }

    #[test]
    fn test_spawn_captures_panic() {
        let future = spawn(&InlineExecutor, || -> u8 { panic!("job failed") });
        let error = future.get().unwrap_err();
        assert!(error.is_panic());
    }

    #[test]
    fn test_spawn_continuation_on_manual_executor() {
        let executor = Arc::new(ManualExecutor::default());
        let next = spawn(&executor, || 2)
            .via(Arc::clone(&executor))
            .then(|v| v * 10);

        // the spawned job first, then the continuation it schedules
        assert_eq!(executor.run_all(), 1);
        assert!(!next.is_ready());
        assert_eq!(executor.run_all(), 1);
        assert_eq!(next.get().unwrap(), 20);
    }
}
