//! Task queue for the thread pool
//!
//! Max-heap on priority. Not synchronized on its own: the pool guards it with
//! the same mutex as its lifecycle state.

use std::collections::BinaryHeap;

use super::task::{Task, TaskId, TaskIdGenerator, TaskPriority};
use crate::runtime::executor::Job;

/// Priority-ordered task queue.
///
/// Higher priorities pop first; equal priorities pop in submission order.
#[derive(Debug, Default)]
pub struct PriorityTaskQueue {
    heap: BinaryHeap<Task>,
    ids: TaskIdGenerator,
}

impl PriorityTaskQueue {
    /// Create a new empty queue.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a job with the given priority.
    pub fn push(
        &mut self,
        job: Job,
        priority: TaskPriority,
    ) -> TaskId {
        let id = self.ids.next();
        self.heap.push(Task::new(id, priority, job));
        id
    }

    /// Pop the highest priority task.
    #[inline]
    pub fn pop(&mut self) -> Option<Task> {
        self.heap.pop()
    }

    /// Priority of the next task to pop.
    #[inline]
    pub fn peek_priority(&self) -> Option<TaskPriority> {
        self.heap.peek().map(Task::priority)
    }

    /// Remove every queued task.
    pub fn drain(&mut self) -> Vec<Task> {
        self.heap.drain().collect()
    }

    /// Get the number of queued tasks.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
