//! Deferred work
//!
//! The `playerReady` dispatch waits one macrotask after the player announces
//! readiness. Browser hosts implement [`Scheduler`] with `setTimeout(f, 0)`;
//! [`TaskQueue`] is a manual queue for embedders that drive their own loop.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::trace;

/// Unit of deferred work
pub type Task = Box<dyn FnOnce()>;

/// Defers a task to the next scheduling tick
pub trait Scheduler {
    fn defer(&self, task: Task);
}

/// FIFO task queue drained explicitly by the owner
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Run every task queued so far. Tasks queued while draining wait for
    /// the next call, like a macrotask boundary.
    pub fn run_pending(&self) -> usize {
        let batch: Vec<Task> = self.tasks.borrow_mut().drain(..).collect();
        let count = batch.len();
        for task in batch {
            task();
        }
        trace!(count, "Deferred tasks executed");
        count
    }
}

impl Scheduler for TaskQueue {
    fn defer(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}
