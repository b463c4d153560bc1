#![deny(missing_docs)]

//! A worker thread pool library with type-erased, checked task results.
//!
//! Tasks implement [`Task`] (plain closures qualify) and are submitted to
//! a [`ThreadPool`], which hands back a [`TaskResult`] that can be blocked
//! on for the task's value. The pool runs a fixed number of OS threads,
//! or grows and shrinks on demand in [`PoolMode::Cached`]. The task queue
//! is bounded: a submission that finds it full waits briefly for space and
//! then comes back invalid instead of blocking forever.

mod error;
mod pool;
mod result;
mod task;
mod value;
mod worker;

pub use error::{PoolError, Result};
pub use pool::{
    PoolMode, ThreadPool, DEFAULT_INITIAL_THREADS, DEFAULT_MAX_THREADS, DEFAULT_QUEUE_CAPACITY,
};
pub use result::TaskResult;
pub use task::Task;
pub use value::TaskValue;
