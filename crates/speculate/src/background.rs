//! Fire-and-forget execution.
//!
//! Each call gets its own single-worker pool that is shut down without
//! waiting. Nothing is handed back: completion, results, errors and panics of
//! the spawned work cannot be observed through this module. Work that needs
//! to report back must do so through its own side effects.

use crate::executor::Executor;
use std::future::Future;
use std::num::NonZeroUsize;

const BACKGROUND_THREAD_NAME: &str = "speculate-background";

/// Runs `work` on a dedicated thread and returns immediately.
///
/// ```
/// use std::sync::mpsc;
///
/// let (tx, rx) = mpsc::channel();
/// speculate::spawn(move || tx.send("done").ok());
/// assert_eq!(rx.recv().unwrap(), "done");
/// ```
pub fn spawn<F, R>(work: F)
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let mut executor = Executor::with_name(NonZeroUsize::MIN, BACKGROUND_THREAD_NAME);
    match executor.submit(work) {
        Ok(handle) => tracing::trace!(task = handle.id(), "Background work dispatched"),
        Err(err) => tracing::warn!(error = %err, "Failed to start background worker"),
    }
    executor.shutdown(false);
}

/// Runs `work(args)` on a dedicated thread and returns immediately.
pub fn spawn_with_args<A, F, R>(work: F, args: A)
where
    A: Send + 'static,
    F: FnOnce(A) -> R + Send + 'static,
    R: Send + 'static,
{
    spawn(move || work(args));
}

/// Drives the future built by `make_future` to completion on a dedicated
/// thread with its own current-thread tokio runtime, and returns immediately.
///
/// The future is built on the background thread, so it does not need to be
/// `Send`.
pub fn spawn_async<F, Fut>(make_future: F)
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future + 'static,
{
    spawn(move || {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => {
                runtime.block_on(make_future());
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to build runtime for background future");
            }
        }
    });
}
