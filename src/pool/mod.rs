//! # Worker Pool Module
//!
//! Thread-based parallelism for read fan-out. Two layers:
//!
//! - [`ThreadPool`] — a fixed set of OS threads draining a FIFO job
//!   queue, with an in-flight counter so callers can wait for the
//!   queue (including jobs submitted *by* running jobs) to drain.
//! - [`WorkerPool`] — owns a `ThreadPool` and implements the fan-out
//!   idiom the engine's parallel searches use: the same task closure
//!   is submitted once per worker, and a running task may requeue
//!   itself to claim another unit of work.
//!
//! ## Guarantees
//!
//! - A submitted job runs to completion exactly once.
//! - [`WorkerPool::wait_all`] returns only after the **transitive
//!   closure** of submissions — direct launches plus every
//!   requeue — has completed.
//! - Cancellation is cooperative: tasks observe shared state and
//!   return early; nothing is ever aborted.
//!
//! Dropping the pool closes the job channel; workers finish whatever
//! is queued, then exit and are joined.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Sender, unbounded};
use tracing::trace;

// ------------------------------------------------------------------------------------------------
// ThreadPool
// ------------------------------------------------------------------------------------------------

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Tracks how many jobs are queued or running, and wakes waiters when
/// the count reaches zero.
struct PoolState {
    in_flight: Mutex<usize>,
    idle: Condvar,
}

impl PoolState {
    fn start_one(&self) {
        let mut count = self.in_flight.lock().expect("pool state lock poisoned");
        *count += 1;
    }

    fn finish_one(&self) {
        let mut count = self.in_flight.lock().expect("pool state lock poisoned");
        *count -= 1;
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// A fixed-size pool of worker threads backing a FIFO job queue.
pub struct ThreadPool {
    sender: Option<Sender<Job>>,
    state: Arc<PoolState>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawns `threads` worker threads (at least one).
    pub fn new(threads: usize) -> Self {
        assert!(threads > 0, "thread pool needs at least one worker");

        let (sender, receiver) = unbounded::<Job>();
        let state = Arc::new(PoolState {
            in_flight: Mutex::new(0),
            idle: Condvar::new(),
        });

        let workers = (0..threads)
            .map(|i| {
                let receiver = receiver.clone();
                let state = Arc::clone(&state);
                thread::Builder::new()
                    .name(format!("stratakv-worker-{i}"))
                    .spawn(move || {
                        while let Ok(job) = receiver.recv() {
                            job();
                            state.finish_one();
                        }
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self {
            sender: Some(sender),
            state,
            workers,
        }
    }

    /// Enqueues a job for execution on some worker thread.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) {
        self.submitter().submit(Box::new(job));
    }

    /// Blocks until every queued and running job has finished.
    pub fn wait_idle(&self) {
        let mut count = self.state.in_flight.lock().expect("pool state lock poisoned");
        while *count > 0 {
            count = self.state.idle.wait(count).expect("pool state lock poisoned");
        }
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    fn submitter(&self) -> JobSubmitter {
        JobSubmitter {
            sender: self
                .sender
                .as_ref()
                .expect("job channel open while pool is alive")
                .clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Closing the channel lets workers drain the queue and exit.
        self.sender = None;
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

/// A cloneable handle that can enqueue jobs from any thread,
/// including from inside a running job.
#[derive(Clone)]
struct JobSubmitter {
    sender: Sender<Job>,
    state: Arc<PoolState>,
}

impl JobSubmitter {
    fn submit(&self, job: Job) {
        self.state.start_one();
        // Send fails only when the pool is shutting down; a job
        // submitted that late is dropped.
        if self.sender.send(job).is_err() {
            self.state.finish_one();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// WorkerPool — fan-out over the thread pool
// ------------------------------------------------------------------------------------------------

/// A task body for [`WorkerPool::launch`]: cloneable, shared across
/// workers, and re-submittable from inside a run via
/// [`TaskContext::requeue`].
pub type FanoutTask = Arc<dyn Fn(&TaskContext<'_>) + Send + Sync + 'static>;

/// Fan-out executor used by the engine's parallel point and range
/// searches. Owns the underlying [`ThreadPool`].
pub struct WorkerPool {
    pool: ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// Creates a pool of `threads` workers.
    pub fn new(threads: usize) -> Self {
        Self {
            pool: ThreadPool::new(threads),
            threads,
        }
    }

    /// Submits `task` once per worker thread.
    ///
    /// Each invocation receives a [`TaskContext`] through which it may
    /// requeue itself to claim further work units.
    pub fn launch(&self, task: FanoutTask) {
        trace!(threads = self.threads, "fan-out launch");
        for _ in 0..self.threads {
            submit_fanout(self.pool.submitter(), Arc::clone(&task));
        }
    }

    /// Blocks until all launched tasks — including every requeued
    /// submission — have completed.
    pub fn wait_all(&self) {
        self.pool.wait_idle();
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }
}

/// Handed to every fan-out task invocation; allows the task to
/// resubmit itself onto the pool.
pub struct TaskContext<'a> {
    submitter: &'a JobSubmitter,
    task: &'a FanoutTask,
}

impl TaskContext<'_> {
    /// Submits the current task once more. The new submission counts
    /// toward [`WorkerPool::wait_all`].
    pub fn requeue(&self) {
        submit_fanout(self.submitter.clone(), Arc::clone(self.task));
    }
}

fn submit_fanout(submitter: JobSubmitter, task: FanoutTask) {
    let job_submitter = submitter.clone();
    submitter.submit(Box::new(move || {
        let cx = TaskContext {
            submitter: &job_submitter,
            task: &task,
        };
        (*task)(&cx);
    }));
}
