//! Common test utilities for speculate integration tests.

#![allow(dead_code)]

use speculate::{BoxError, Outcome};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

/// One recorded outcome invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Call<T> {
    /// Candidate the outcome ran for
    pub input: T,
    /// Thread it ran on
    pub thread: ThreadId,
}

/// Records every outcome invocation so tests can check where and for what
/// the outcome function ran.
pub struct Recorder<T> {
    calls: Arc<Mutex<Vec<Call<T>>>>,
}

impl<T: Clone + Debug + Send + 'static> Recorder<T> {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Wraps `f` in an [`Outcome`] that records each call before running it.
    pub fn outcome<R, F>(&self, f: F) -> Outcome<T, R>
    where
        R: Send + 'static,
        F: Fn(T) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        let calls = Arc::clone(&self.calls);
        Outcome::new(move |input: T| {
            calls.lock().unwrap().push(Call {
                input: input.clone(),
                thread: thread::current().id(),
            });
            f(input)
        })
    }

    /// Snapshot of recorded calls.
    pub fn calls(&self) -> Vec<Call<T>> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded calls for `input`.
    pub fn calls_for(&self, input: &T) -> Vec<Call<T>>
    where
        T: PartialEq,
    {
        self.calls()
            .into_iter()
            .filter(|call| &call.input == input)
            .collect()
    }
}

impl<T: Clone + Debug + Send + 'static> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Successful result with the error type the tests use.
pub fn ok<T>(value: T) -> Result<T, BoxError> {
    Ok(value)
}

/// Outcome function that sleeps for `delay` before answering `"{input}!"`.
pub fn slow_echo(delay: Duration) -> impl Fn(&'static str) -> Result<String, BoxError> + Send + Sync {
    move |input: &'static str| {
        thread::sleep(delay);
        ok(format!("{input}!"))
    }
}
