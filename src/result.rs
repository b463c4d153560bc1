use crossbeam::channel::{bounded, Receiver, Sender};

use crate::value::TaskValue;

/// Handle to the eventual result of a submitted task.
///
/// Returned by every submission attempt. An accepted submission yields a
/// valid handle whose [`get`](TaskResult::get) blocks until the task has
/// run; a rejected submission yields an invalid handle whose `get` returns
/// an empty [`TaskValue`] immediately, without blocking.
pub struct TaskResult {
    valid: bool,
    receiver: Receiver<TaskValue>,
}

/// Producer half of a result: delivers the value and wakes the waiter.
///
/// Owned by the queued task, used exactly once by the worker that runs it.
pub(crate) struct Completion {
    sender: Sender<TaskValue>,
}

impl TaskResult {
    /// A valid handle and the completion that will fulfill it.
    pub(crate) fn pending() -> (TaskResult, Completion) {
        let (sender, receiver) = bounded(1);
        (
            TaskResult {
                valid: true,
                receiver,
            },
            Completion { sender },
        )
    }

    /// A handle for a submission the pool refused.
    pub(crate) fn rejected() -> TaskResult {
        // The sender is dropped on the spot; nothing will ever arrive.
        let (_, receiver) = bounded(1);
        TaskResult {
            valid: false,
            receiver,
        }
    }

    /// Whether the submission that produced this handle was accepted.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Waits for the task to finish and takes its value.
    ///
    /// Returns an empty [`TaskValue`] immediately if the handle is invalid,
    /// and an empty value if the task was discarded before it could run
    /// (the pool shut down while it was still queued).
    pub fn get(self) -> TaskValue {
        if !self.valid {
            return TaskValue::empty();
        }
        self.receiver
            .recv()
            .unwrap_or_else(|_| TaskValue::empty())
    }
}

impl Completion {
    /// Delivers the value. The waiter may already have dropped its handle;
    /// the value is discarded in that case.
    pub(crate) fn complete(self, value: TaskValue) {
        let _ = self.sender.send(value);
    }
}
