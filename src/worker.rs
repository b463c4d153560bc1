use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::pool::{PoolMode, PoolState, Shared};

/// Idle time after which a cached-mode worker beyond the initial count
/// retires.
const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Wait granularity in cached mode, so idle time is re-checked even when
/// no tasks arrive.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A worker: a unique id bound to the loop that consumes the task queue.
pub(crate) struct Worker {
    id: u64,
    shared: Arc<Shared>,
}

impl Worker {
    pub(crate) fn new(id: u64, shared: Arc<Shared>) -> Worker {
        Worker { id, shared }
    }

    /// Spawns the worker loop on a named OS thread.
    pub(crate) fn spawn(self) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("pool-worker-{}", self.id))
            .spawn(move || self.run())
    }

    /// Acquire a task, execute it outside the lock, repeat.
    ///
    /// The loop exits when the pool stops running, or in cached mode when
    /// this worker has been idle past the threshold while the pool is
    /// above its initial size. Either way it removes its own registry
    /// entry under the lock as its final act.
    fn run(self) {
        debug!("worker {} started", self.id);
        let mut last_active = Instant::now();
        loop {
            let item = {
                let mut state = self.shared.state.lock().unwrap();
                loop {
                    // Checked before any dequeue, so tasks still queued
                    // when the pool stops are never dispatched.
                    if !state.running {
                        self.retire(&mut state);
                        self.shared.all_exited.notify_all();
                        debug!("worker {} exiting, pool shut down", self.id);
                        return;
                    }
                    if !state.queue.is_empty() {
                        break;
                    }
                    match state.mode {
                        PoolMode::Fixed => {
                            state = self.shared.not_empty.wait(state).unwrap();
                        }
                        PoolMode::Cached => {
                            let (guard, timeout) = self
                                .shared
                                .not_empty
                                .wait_timeout(state, POLL_INTERVAL)
                                .unwrap();
                            state = guard;
                            if timeout.timed_out()
                                && last_active.elapsed() >= IDLE_TIMEOUT
                                && state.current_threads > state.initial_threads
                            {
                                self.retire(&mut state);
                                debug!("worker {} retiring after sitting idle", self.id);
                                return;
                            }
                        }
                    }
                }
                state.idle_threads -= 1;
                let item = state
                    .queue
                    .pop_front()
                    .expect("queue is non-empty while the lock is held");
                if !state.queue.is_empty() {
                    self.shared.not_empty.notify_all();
                }
                self.shared.not_full.notify_all();
                item
            };

            debug!("worker {} executing a task", self.id);
            item.execute();
            last_active = Instant::now();
            self.shared.state.lock().unwrap().idle_threads += 1;
        }
    }

    /// Removes this worker from the registry and the counters. The join
    /// handle moves to the retired list so shutdown can reap the thread.
    fn retire(&self, state: &mut PoolState) {
        if let Some(handle) = state.workers.remove(&self.id) {
            state.retired.push(handle);
        }
        state.current_threads -= 1;
        state.idle_threads -= 1;
    }
}
