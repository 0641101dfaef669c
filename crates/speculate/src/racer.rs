//! Outcome racer: optimistic pre-start of one outcome per candidate.

use crate::error::BoxError;
use crate::executor::{Executor, TaskHandle};
use std::fmt;
use std::sync::Arc;

type OutcomeFn<T, R> = dyn Fn(T) -> Result<R, BoxError> + Send + Sync + 'static;

/// Handle to one pre-started outcome computation.
pub(crate) type OutcomeHandle<R> = TaskHandle<Result<R, BoxError>>;

/// The outcome function: maps one candidate input to a result.
///
/// Cheap to clone; every clone shares the same callable, which may be
/// invoked from several worker threads at once.
pub struct Outcome<T, R> {
    call: Arc<OutcomeFn<T, R>>,
}

impl<T, R> Outcome<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Wraps a function of one candidate.
    pub fn new<F, E>(f: F) -> Self
    where
        F: Fn(T) -> Result<R, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            call: Arc::new(move |input| f(input).map_err(Into::into)),
        }
    }

    fn submit(&self, executor: &mut Executor, input: T) -> std::io::Result<OutcomeHandle<R>> {
        let call = Arc::clone(&self.call);
        executor.submit(move || call(input))
    }
}

impl<T, R> Outcome<T, R> {
    /// Computes the outcome for `input` on the current thread.
    pub fn call(&self, input: T) -> Result<R, BoxError> {
        (self.call)(input)
    }
}

impl<T, R> Clone for Outcome<T, R> {
    fn clone(&self) -> Self {
        Self {
            call: Arc::clone(&self.call),
        }
    }
}

impl<T, R> fmt::Debug for Outcome<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outcome").finish_non_exhaustive()
    }
}

/// Submits one outcome task per candidate, in priority order.
///
/// If a submission fails, every task queued so far is cancelled before the
/// error is returned.
pub(crate) fn submit_outcomes<T, R>(
    executor: &mut Executor,
    outcome: &Outcome<T, R>,
    candidates: &[T],
) -> std::io::Result<Vec<OutcomeHandle<R>>>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
{
    let mut handles = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match outcome.submit(executor, candidate.clone()) {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                cancel_all(&handles);
                return Err(err);
            }
        }
    }
    tracing::debug!(count = handles.len(), "Outcome tasks submitted");
    Ok(handles)
}

/// Requests cancellation of every handle; returns how many were stopped
/// before starting.
pub(crate) fn cancel_all<R>(handles: &[OutcomeHandle<R>]) -> usize {
    handles.iter().filter(|handle| handle.cancel()).count()
}
