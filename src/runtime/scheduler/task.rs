//! Task definitions for the thread pool.
//!
//! A task is a queued [`Job`] together with its priority and a submission id.

use std::cmp::Ordering;
use std::fmt;

use crate::runtime::executor::Job;

/// Unique task identifier, increasing in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Get the inner value.
    #[inline]
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(val: u64) -> Self {
        Self(val)
    }
}

impl fmt::Display for TaskId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// Task priority; larger values run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskPriority(pub i32);

impl TaskPriority {
    /// Low priority tasks.
    pub const LOW: Self = Self(0);
    /// Normal priority (default).
    pub const NORMAL: Self = Self(1);
    /// High priority tasks.
    pub const HIGH: Self = Self(2);
    /// Critical priority tasks.
    pub const CRITICAL: Self = Self(3);

    /// Get the inner value.
    #[inline]
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl From<i32> for TaskPriority {
    fn from(val: i32) -> Self {
        Self(val)
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match *self {
            Self::LOW => write!(f, "low"),
            Self::NORMAL => write!(f, "normal"),
            Self::HIGH => write!(f, "high"),
            Self::CRITICAL => write!(f, "critical"),
            Self(other) => write!(f, "{}", other),
        }
    }
}

/// A queued unit of work.
///
/// Ordered for a max-heap: higher priority first, then lower id first.
pub struct Task {
    id: TaskId,
    priority: TaskPriority,
    job: Job,
}

impl Task {
    /// Create a new task.
    pub fn new(
        id: TaskId,
        priority: TaskPriority,
        job: Job,
    ) -> Self {
        Self { id, priority, job }
    }

    /// Get the task ID.
    #[inline]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Get the priority.
    #[inline]
    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Take the job out of the task.
    #[inline]
    pub fn into_job(self) -> Job {
        self.job
    }
}

impl fmt::Debug for Task {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Task {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}

impl PartialOrd for Task {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Task {
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Generator for task IDs.
#[derive(Debug, Default)]
pub struct TaskIdGenerator {
    next_id: u64,
}

impl TaskIdGenerator {
    /// Create a new task ID generator.
    #[inline]
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Generate the next task ID.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        TaskId(id)
    }
}
