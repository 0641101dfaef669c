//! Predicate runner: the computation whose output selects a candidate.

use crate::error::BoxError;
use crate::executor::{Executor, TaskHandle};
use std::fmt;

type PredicateFn<T> = Box<dyn FnOnce() -> Result<T, BoxError> + Send + 'static>;

/// A predicate callable together with its bound arguments.
///
/// # Examples
///
/// ```
/// use speculate::Predicate;
///
/// let classify = Predicate::with_args(
///     |(a, b): (i32, i32)| Ok::<_, std::io::Error>(a + b),
///     (1, 2),
/// );
/// assert_eq!(classify.call().unwrap(), 3);
/// ```
pub struct Predicate<T> {
    call: PredicateFn<T>,
}

impl<T: Send + 'static> Predicate<T> {
    /// Wraps a closure that already captures its inputs.
    pub fn new<F, E>(f: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            call: Box::new(move || f().map_err(Into::into)),
        }
    }

    /// Binds `args` to a one-argument function.
    pub fn with_args<A, F, E>(f: F, args: A) -> Self
    where
        A: Send + 'static,
        F: FnOnce(A) -> Result<T, E> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::new(move || f(args))
    }

    /// Runs the predicate on the current thread.
    pub fn call(self) -> Result<T, BoxError> {
        (self.call)()
    }

    /// Queues the predicate on `executor`.
    pub(crate) fn submit(
        self,
        executor: &mut Executor,
    ) -> std::io::Result<TaskHandle<Result<T, BoxError>>> {
        executor.submit(self.call)
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").finish_non_exhaustive()
    }
}
