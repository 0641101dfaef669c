//! Result handles for submitted work.

use crate::error::TaskError;
use crossbeam_channel::Receiver;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Lifecycle of a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Queued, not yet picked up by a worker.
    Pending,
    /// A worker is executing it.
    Running,
    /// Cancelled before it started; it will never run.
    Cancelled,
    /// Finished (successfully or by panicking).
    Finished,
}

impl TaskState {
    fn as_u8(self) -> u8 {
        match self {
            TaskState::Pending => 0,
            TaskState::Running => 1,
            TaskState::Cancelled => 2,
            TaskState::Finished => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskState::Pending,
            1 => TaskState::Running,
            2 => TaskState::Cancelled,
            _ => TaskState::Finished,
        }
    }

    /// Returns `true` once a worker has picked the task up.
    pub fn has_started(self) -> bool {
        matches!(self, TaskState::Running | TaskState::Finished)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::Running => write!(f, "running"),
            TaskState::Cancelled => write!(f, "cancelled"),
            TaskState::Finished => write!(f, "finished"),
        }
    }
}

/// State shared between a handle and the queued job.
#[derive(Debug)]
pub(crate) struct TaskCell {
    state: AtomicU8,
    cancel_requests: AtomicUsize,
}

impl TaskCell {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(TaskState::Pending.as_u8()),
            cancel_requests: AtomicUsize::new(0),
        }
    }

    pub(crate) fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: TaskState, to: TaskState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Claims the task for a worker. Fails if it was cancelled first.
    pub(crate) fn try_start(&self) -> bool {
        self.transition(TaskState::Pending, TaskState::Running)
    }

    pub(crate) fn finish(&self) {
        self.state.store(TaskState::Finished.as_u8(), Ordering::Release);
    }

    pub(crate) fn request_cancel(&self) -> bool {
        self.cancel_requests.fetch_add(1, Ordering::AcqRel);
        self.transition(TaskState::Pending, TaskState::Cancelled)
    }

    pub(crate) fn cancel_requests(&self) -> usize {
        self.cancel_requests.load(Ordering::Acquire)
    }
}

/// Handle to work submitted to an [`Executor`](super::Executor).
///
/// Dropping the handle does not cancel the task; its result is discarded.
pub struct TaskHandle<R> {
    id: usize,
    cell: Arc<TaskCell>,
    rx: Receiver<Result<R, TaskError>>,
}

impl<R> TaskHandle<R> {
    pub(crate) fn new(
        id: usize,
        cell: Arc<TaskCell>,
        rx: Receiver<Result<R, TaskError>>,
    ) -> Self {
        Self { id, cell, rx }
    }

    /// Submission sequence number within the owning executor.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Requests cancellation.
    ///
    /// Returns `true` only if the task had not started yet, in which case it
    /// will never run. A running task is left alone and `false` is returned.
    pub fn cancel(&self) -> bool {
        self.cell.request_cancel()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.cell.state()
    }

    /// Returns `true` if the task was cancelled before starting.
    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    /// Number of times [`cancel`](Self::cancel) has been called.
    pub fn cancel_requests(&self) -> usize {
        self.cell.cancel_requests()
    }

    /// Blocks the current thread until the task's result is available.
    ///
    /// Safe to call from any thread, including an async runtime worker, where
    /// it stalls that worker for the duration. Prefer [`join`](Self::join) there.
    pub fn wait(self) -> Result<R, TaskError> {
        self.rx.recv().unwrap_or(Err(TaskError::Cancelled))
    }
}

impl<R: Send + 'static> TaskHandle<R> {
    /// Waits for the task's result without blocking the async runtime.
    ///
    /// Must be awaited inside a tokio runtime; the wait itself runs on the
    /// runtime's blocking pool.
    pub async fn join(self) -> Result<R, TaskError> {
        tokio::task::spawn_blocking(move || self.wait())
            .await
            .unwrap_or_else(|err| {
                Err(TaskError::Panicked {
                    message: err.to_string(),
                })
            })
    }
}

impl<R> fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("cancel_requests", &self.cancel_requests())
            .finish()
    }
}
