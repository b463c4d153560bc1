use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::error;

use crate::result::Completion;
use crate::value::TaskValue;

/// A unit of work the pool can run.
///
/// Implement this for task types that carry their own state, or submit a
/// closure directly: every `FnOnce() -> T` where `T` is sendable is a
/// `Task` whose return value is wrapped in a [`TaskValue`].
pub trait Task: Send {
    /// Runs the task to completion, producing its result value.
    ///
    /// Consumes the task; a task runs at most once.
    fn run(self: Box<Self>) -> TaskValue;
}

impl<T, F> Task for F
where
    F: FnOnce() -> T + Send + 'static,
    T: Any + Send,
{
    fn run(self: Box<Self>) -> TaskValue {
        TaskValue::new((*self)())
    }
}

/// A queue entry: a task bound to the completion that fulfills its handle.
///
/// The pairing happens at submission time, so by the time a worker sees a
/// `WorkItem` there is always exactly one waiting handle to deliver to.
pub(crate) struct WorkItem {
    task: Box<dyn Task>,
    completion: Completion,
}

impl WorkItem {
    pub(crate) fn new(task: Box<dyn Task>, completion: Completion) -> Self {
        WorkItem { task, completion }
    }

    /// Runs the task and delivers its value.
    ///
    /// A panicking task is contained here: the panic is logged and an
    /// empty value is delivered so the waiter unblocks and the worker
    /// thread survives.
    pub(crate) fn execute(self) {
        let WorkItem { task, completion } = self;
        match catch_unwind(AssertUnwindSafe(move || task.run())) {
            Ok(value) => completion.complete(value),
            Err(_) => {
                error!("task panicked, delivering an empty result");
                completion.complete(TaskValue::empty());
            }
        }
    }
}
