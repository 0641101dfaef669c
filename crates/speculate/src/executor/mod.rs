//! Bounded worker pool with best-effort cancellation.
//!
//! An [`Executor`] owns up to `max_workers` named OS threads that pull jobs
//! from a FIFO queue, so work submitted earlier starts earlier when the pool
//! is saturated. Threads are started lazily, only when queued and running
//! work outnumbers the workers already started.
//!
//! Cancellation is advisory: [`TaskHandle::cancel`] prevents a queued task
//! from ever starting, but never interrupts one that is already running.
//!
//! ```
//! use speculate::executor::Executor;
//! use std::num::NonZeroUsize;
//!
//! let mut executor = Executor::new(NonZeroUsize::MIN);
//! let handle = executor.submit(|| 6 * 7).unwrap();
//! assert_eq!(handle.wait().unwrap(), 42);
//! executor.shutdown(false);
//! ```

mod handle;

pub use handle::{TaskHandle, TaskState};

use crate::error::{TaskError, panic_message};
use crossbeam_channel::{Receiver, Sender, unbounded};
use handle::TaskCell;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

const DEFAULT_THREAD_NAME: &str = "speculate-worker";

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A bounded pool of worker threads.
///
/// Owned by exactly one caller; submitting needs `&mut self`, so a pool is
/// never shared between concurrent callers. [`shutdown`](Self::shutdown) consumes it;
/// dropping it performs a non-blocking shutdown.
pub struct Executor {
    /// `None` once the pool is shut down; dropping it disconnects the workers.
    sender: Option<Sender<Job>>,
    receiver: Receiver<Job>,
    /// Jobs queued or running; decremented by the worker once a job is done.
    outstanding: Arc<AtomicUsize>,
    max_workers: NonZeroUsize,
    name: String,
    next_id: usize,
    workers: Vec<JoinHandle<()>>,
}

impl Executor {
    /// Creates a pool of at most `max_workers` threads.
    pub fn new(max_workers: NonZeroUsize) -> Self {
        Self::with_name(max_workers, DEFAULT_THREAD_NAME)
    }

    /// Creates a pool whose threads are named `"{name}-{n}"`.
    pub fn with_name(max_workers: NonZeroUsize, name: impl Into<String>) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender: Some(sender),
            receiver,
            outstanding: Arc::new(AtomicUsize::new(0)),
            max_workers,
            name: name.into(),
            next_id: 0,
            workers: Vec::new(),
        }
    }

    /// Maximum number of worker threads.
    pub fn max_workers(&self) -> NonZeroUsize {
        self.max_workers
    }

    /// Number of worker threads started so far.
    pub fn spawned_workers(&self) -> usize {
        self.workers.len()
    }

    /// Queues `work` and returns a handle to its result.
    ///
    /// A panic inside `work` resolves the handle with
    /// [`TaskError::Panicked`]; the worker keeps serving the queue.
    ///
    /// # Errors
    ///
    /// Fails if no worker exists and a new thread cannot be started.
    pub fn submit<F, R>(&mut self, work: F) -> std::io::Result<TaskHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let cell = Arc::new(TaskCell::new());
        let job_cell = Arc::clone(&cell);
        let id = self.next_id;

        let job: Job = Box::new(move || {
            if !job_cell.try_start() {
                tracing::trace!(task = id, "Skipping cancelled task");
                return;
            }
            let result = panic::catch_unwind(AssertUnwindSafe(work)).map_err(|payload| {
                TaskError::Panicked {
                    message: panic_message(payload.as_ref()),
                }
            });
            job_cell.finish();
            if let Err(TaskError::Panicked { message }) = &result {
                tracing::warn!(task = id, panic = %message, "Task panicked");
            }
            if tx.send(result).is_err() && job_cell.cancel_requests() > 0 {
                tracing::debug!(
                    task = id,
                    "Discarding result of task that finished after cancellation was requested"
                );
            }
        });

        // Outstanding jobs plus this one must not outnumber the workers.
        let needs_worker = self.outstanding.load(Ordering::Acquire) >= self.workers.len()
            && self.workers.len() < self.max_workers.get();
        if needs_worker {
            self.spawn_worker()?;
        }

        let Some(sender) = &self.sender else {
            return Err(std::io::Error::other("executor is shut down"));
        };
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        if sender.send(job).is_err() {
            self.outstanding.fetch_sub(1, Ordering::AcqRel);
            return Err(std::io::Error::other("executor queue disconnected"));
        }
        self.next_id += 1;

        Ok(TaskHandle::new(id, cell, rx))
    }

    fn spawn_worker(&mut self) -> std::io::Result<()> {
        let receiver = self.receiver.clone();
        let outstanding = Arc::clone(&self.outstanding);
        match thread::Builder::new()
            .name(format!("{}-{}", self.name, self.workers.len()))
            .spawn(move || worker_loop(&receiver, &outstanding))
        {
            Ok(worker) => {
                self.workers.push(worker);
                Ok(())
            }
            Err(err) if self.workers.is_empty() => Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to start extra worker; queueing task");
                Ok(())
            }
        }
    }

    /// Stops accepting work and releases the pool.
    ///
    /// Already-queued tasks that were not cancelled still run. With
    /// `wait = true` this blocks until every worker has exited; with
    /// `wait = false` it returns immediately and workers finish in the
    /// background.
    pub fn shutdown(mut self, wait: bool) {
        self.close(wait);
    }

    fn close(&mut self, wait: bool) {
        drop(self.sender.take());

        let workers = std::mem::take(&mut self.workers);
        if wait {
            for worker in workers {
                if worker.join().is_err() {
                    tracing::warn!("Worker thread exited abnormally");
                }
            }
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.close(false);
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("name", &self.name)
            .field("max_workers", &self.max_workers)
            .field("workers", &self.workers.len())
            .field("queued", &self.receiver.len())
            .finish_non_exhaustive()
    }
}

/// Runs jobs until every sender is gone and the queue is drained.
fn worker_loop(receiver: &Receiver<Job>, outstanding: &AtomicUsize) {
    while let Ok(job) = receiver.recv() {
        job();
        outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}
