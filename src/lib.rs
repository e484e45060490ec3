//! Promissory
//!
//! Promises, futures and continuation chains over pluggable executors and a
//! fixed-size priority thread pool.
//!
//! # Example
//!
//! ```
//! use promissory::prelude::*;
//!
//! let runtime = Runtime::with_threads(2).unwrap();
//! let answer = runtime
//!     .spawn(|| 20)
//!     .via(runtime.executor())
//!     .then(|v| v * 2)
//!     .then(|v| v + 2);
//! assert_eq!(answer.get().unwrap(), 42);
//! runtime.shutdown();
//! ```

#![doc(html_root_url = "https://docs.rs/promissory")]
#![warn(rust_2018_idioms)]

// Public modules
pub mod runtime;

// Utility modules
pub mod util;

// Re-exports
pub use runtime::error::{Error, Outcome, PoolError, RuntimeError};
pub use runtime::Runtime;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = "promissory";

/// Common imports.
pub mod prelude {
    pub use crate::runtime::continuation::{self as handler, Handler};
    pub use crate::runtime::error::{Error, Outcome, RuntimeError};
    pub use crate::runtime::executor::{execute, spawn, try_spawn, Executor, InlineExecutor};
    pub use crate::runtime::future::{
        make_error_future, make_future_promise_pair, make_ready_future, make_ready_shared_future,
        make_shared_future_promise_pair, ContinuableFuture, ContinuableSharedFuture, Future,
        Promise, SharedFuture,
    };
    pub use crate::runtime::scheduler::{PoolExecutor, TaskPriority, ThreadPool};
    pub use crate::runtime::Runtime;
}
