use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error};

use crate::result::TaskResult;
use crate::task::{Task, WorkItem};
use crate::worker::Worker;
use crate::{PoolError, Result};

/// Number of workers started by [`ThreadPool::start_default`].
pub const DEFAULT_INITIAL_THREADS: usize = 4;

/// Default cap on pool growth in cached mode.
pub const DEFAULT_MAX_THREADS: usize = 10;

/// Default queue capacity. Effectively unbounded.
pub const DEFAULT_QUEUE_CAPACITY: usize = usize::MAX;

/// How long `submit` waits for queue space before rejecting a task.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Sizing policy for a [`ThreadPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolMode {
    /// The pool keeps exactly the number of workers it started with.
    Fixed,
    /// The pool grows under backlog, up to a cap, and retires workers that
    /// sit idle too long, never dropping below the initial count.
    Cached,
}

/// Everything guarded by the queue mutex. The queue, the counters, and the
/// worker registry move together; every mutation happens under this lock.
pub(crate) struct PoolState {
    pub(crate) queue: VecDeque<WorkItem>,
    pub(crate) workers: HashMap<u64, JoinHandle<()>>,
    pub(crate) retired: Vec<JoinHandle<()>>,
    pub(crate) mode: PoolMode,
    pub(crate) running: bool,
    pub(crate) initial_threads: usize,
    pub(crate) max_threads: usize,
    pub(crate) queue_capacity: usize,
    pub(crate) current_threads: usize,
    pub(crate) idle_threads: usize,
}

pub(crate) struct Shared {
    pub(crate) state: Mutex<PoolState>,
    /// Signaled on enqueue and at shutdown; workers wait here for tasks.
    pub(crate) not_empty: Condvar,
    /// Signaled on dequeue and at shutdown; producers wait here for space.
    pub(crate) not_full: Condvar,
    /// Signaled by every exiting worker; shutdown waits here until the
    /// registry drains.
    pub(crate) all_exited: Condvar,
    pub(crate) next_worker_id: AtomicU64,
}

/// A pool of OS worker threads consuming a bounded FIFO task queue.
///
/// Configure an unstarted pool with [`set_mode`](ThreadPool::set_mode),
/// [`set_queue_capacity`](ThreadPool::set_queue_capacity), and
/// [`set_max_threads`](ThreadPool::set_max_threads), then call
/// [`start`](ThreadPool::start). Once running, the configuration is frozen.
/// Dropping the pool blocks until every worker has exited; tasks still
/// queued at that point are discarded and their handles yield empty values.
pub struct ThreadPool {
    shared: Arc<Shared>,
}

impl ThreadPool {
    /// Creates an unstarted pool: fixed mode, an effectively unbounded
    /// queue, and a cached-mode growth cap of [`DEFAULT_MAX_THREADS`].
    pub fn new() -> ThreadPool {
        ThreadPool {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    queue: VecDeque::new(),
                    workers: HashMap::new(),
                    retired: Vec::new(),
                    mode: PoolMode::Fixed,
                    running: false,
                    initial_threads: DEFAULT_INITIAL_THREADS,
                    max_threads: DEFAULT_MAX_THREADS,
                    queue_capacity: DEFAULT_QUEUE_CAPACITY,
                    current_threads: 0,
                    idle_threads: 0,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                all_exited: Condvar::new(),
                next_worker_id: AtomicU64::new(0),
            }),
        }
    }

    /// Selects the sizing policy.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` once the pool is running.
    pub fn set_mode(&self, mode: PoolMode) -> Result<()> {
        let mut state = self.shared.state.lock().unwrap();
        if state.running {
            return Err(PoolError::AlreadyStarted);
        }
        state.mode = mode;
        Ok(())
    }

    /// Bounds the task queue. A submission that finds the queue full waits
    /// up to one second for space and then comes back invalid.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a zero capacity, `AlreadyStarted` once the pool
    /// is running.
    pub fn set_queue_capacity(&self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(PoolError::InvalidConfig("queue capacity must be positive"));
        }
        let mut state = self.shared.state.lock().unwrap();
        if state.running {
            return Err(PoolError::AlreadyStarted);
        }
        state.queue_capacity = capacity;
        Ok(())
    }

    /// Caps cached-mode growth. The mode must already be
    /// [`PoolMode::Cached`] when this is called.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a zero cap or a pool not in cached mode,
    /// `AlreadyStarted` once the pool is running.
    pub fn set_max_threads(&self, max_threads: usize) -> Result<()> {
        if max_threads == 0 {
            return Err(PoolError::InvalidConfig(
                "max thread count must be positive",
            ));
        }
        let mut state = self.shared.state.lock().unwrap();
        if state.running {
            return Err(PoolError::AlreadyStarted);
        }
        if state.mode != PoolMode::Cached {
            return Err(PoolError::InvalidConfig(
                "max thread count applies only to cached mode",
            ));
        }
        state.max_threads = max_threads;
        Ok(())
    }

    /// Starts the pool with `initial_threads` workers.
    ///
    /// # Errors
    ///
    /// Fails if `initial_threads` is zero, if the pool has already been
    /// started, or if the OS refuses to spawn a thread.
    pub fn start(&self, initial_threads: usize) -> Result<()> {
        if initial_threads == 0 {
            return Err(PoolError::InvalidConfig(
                "initial thread count must be positive",
            ));
        }
        let mut state = self.shared.state.lock().unwrap();
        if state.running {
            return Err(PoolError::AlreadyStarted);
        }
        state.running = true;
        state.initial_threads = initial_threads;
        for _ in 0..initial_threads {
            self.spawn_worker(&mut state)?;
        }
        debug!("pool started with {} workers", initial_threads);
        Ok(())
    }

    /// Starts the pool with [`DEFAULT_INITIAL_THREADS`] workers.
    pub fn start_default(&self) -> Result<()> {
        self.start(DEFAULT_INITIAL_THREADS)
    }

    /// Submits a task and returns the handle to its eventual result.
    ///
    /// Blocks for up to one second when the queue is full. If space does
    /// not open up in time, or the pool is not running, nothing is
    /// enqueued and the returned handle is invalid: its
    /// [`is_valid`](TaskResult::is_valid) reports `false` and its
    /// [`get`](TaskResult::get) returns an empty value immediately.
    ///
    /// In cached mode, a submission that finds more queued tasks than idle
    /// workers grows the pool by one worker, up to the configured cap.
    pub fn submit<T: Task + 'static>(&self, task: T) -> TaskResult {
        let task: Box<dyn Task> = Box::new(task);
        let state = self.shared.state.lock().unwrap();

        if !state.running {
            error!("task submitted to a pool that is not running, rejecting");
            return TaskResult::rejected();
        }

        // Bounded backpressure: wait for space, then fail fast.
        let (mut state, timeout) = self
            .shared
            .not_full
            .wait_timeout_while(state, SUBMIT_TIMEOUT, |s| {
                s.running && s.queue.len() >= s.queue_capacity
            })
            .unwrap();
        if timeout.timed_out() {
            error!("task queue is full, submission failed");
            return TaskResult::rejected();
        }
        if !state.running {
            error!("pool shut down while a submission was waiting, rejecting");
            return TaskResult::rejected();
        }

        let (result, completion) = TaskResult::pending();
        state.queue.push_back(WorkItem::new(task, completion));
        self.shared.not_empty.notify_all();

        let mut reaped = Vec::new();
        if state.mode == PoolMode::Cached
            && state.queue.len() > state.idle_threads
            && state.current_threads < state.max_threads
        {
            reaped = Self::take_finished(&mut state.retired);
            match self.spawn_worker(&mut state) {
                Ok(id) => debug!("backlog exceeds idle workers, spawned worker {}", id),
                Err(e) => error!("failed to grow the pool: {}", e),
            }
        }
        drop(state);
        // These threads have already exited; joining them does not block.
        for handle in reaped {
            let _ = handle.join();
        }
        result
    }

    /// Stops the pool and blocks until every worker has exited.
    ///
    /// Workers finish the task they are executing. Tasks still waiting in
    /// the queue are discarded and their handles yield empty values.
    /// Subsequent submissions are rejected. Called automatically on drop.
    /// Calling it from inside a task deadlocks.
    pub fn shutdown(&self) {
        let mut state = self.shared.state.lock().unwrap();
        let was_running = state.running;
        let discarded = std::mem::take(&mut state.queue);
        if was_running {
            state.running = false;
            if !discarded.is_empty() {
                debug!(
                    "discarding {} tasks still queued at shutdown",
                    discarded.len()
                );
            }
            self.shared.not_empty.notify_all();
            self.shared.not_full.notify_all();
        }
        while !state.workers.is_empty() {
            state = self.shared.all_exited.wait(state).unwrap();
        }
        let retired = std::mem::take(&mut state.retired);
        drop(state);
        // Discarded tasks may run arbitrary drop code; keep that outside
        // the lock.
        drop(discarded);
        for handle in retired {
            let _ = handle.join();
        }
        if was_running {
            debug!("pool shut down, all workers exited");
        }
    }

    /// The sizing policy currently configured.
    pub fn mode(&self) -> PoolMode {
        self.shared.state.lock().unwrap().mode
    }

    /// Whether the pool has been started and not yet shut down.
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().unwrap().running
    }

    /// Number of live worker threads.
    pub fn thread_count(&self) -> usize {
        self.shared.state.lock().unwrap().current_threads
    }

    /// Number of tasks waiting in the queue.
    pub fn queued_tasks(&self) -> usize {
        self.shared.state.lock().unwrap().queue.len()
    }

    /// Spawns one worker and registers it. The caller holds the state
    /// lock, and the new thread starts by taking that lock, so the
    /// registry entry is in place before the worker loop runs.
    fn spawn_worker(&self, state: &mut PoolState) -> Result<u64> {
        let id = self.shared.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let handle = Worker::new(id, Arc::clone(&self.shared)).spawn()?;
        state.workers.insert(id, handle);
        state.current_threads += 1;
        state.idle_threads += 1;
        Ok(id)
    }

    /// Pulls handles of workers that have fully exited out of the retired
    /// list, so the list stays bounded across repeated grow/retire cycles.
    fn take_finished(retired: &mut Vec<JoinHandle<()>>) -> Vec<JoinHandle<()>> {
        let mut finished = Vec::new();
        let mut kept = Vec::new();
        for handle in retired.drain(..) {
            if handle.is_finished() {
                finished.push(handle);
            } else {
                kept.push(handle);
            }
        }
        *retired = kept;
        finished
    }
}

impl Default for ThreadPool {
    fn default() -> ThreadPool {
        ThreadPool::new()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Blocks the dropping thread until the registry is empty.
        self.shutdown();
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock().unwrap();
        f.debug_struct("ThreadPool")
            .field("mode", &state.mode)
            .field("running", &state.running)
            .field("threads", &state.current_threads)
            .field("idle", &state.idle_threads)
            .field("queued", &state.queue.len())
            .finish()
    }
}
