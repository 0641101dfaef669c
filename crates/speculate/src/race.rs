//! The speculative race: predicate and candidate outcomes run side by side.
//!
//! ```
//! use speculate::{Predicate, RaceConfig, race};
//!
//! let answer = race(
//!     Predicate::new(|| Ok::<_, std::io::Error>("b")),
//!     |candidate: &'static str| Ok::<_, std::io::Error>(candidate.to_uppercase()),
//!     vec!["a", "b", "c"],
//!     &RaceConfig::default(),
//! )
//! .unwrap();
//! assert_eq!(answer, "B");
//! ```

use crate::config::RaceConfig;
use crate::error::{BoxError, RaceError, RaceResult};
use crate::executor::Executor;
use crate::fallback::FallbackPolicy;
use crate::ids::RaceId;
use crate::matcher::{self, Cancellation};
use crate::predicate::Predicate;
use crate::racer::{self, Outcome};
use serde::{Deserialize, Serialize};

const RACE_THREAD_NAME: &str = "speculate-race";

/// How a race produced its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// Taken from the task pre-started for the candidate at `index`.
    Precomputed {
        /// Position of the matched candidate
        index: usize,
    },
    /// Computed on the calling thread after a miss.
    Fresh,
}

/// A race result together with how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceReport<R> {
    /// Identifier used in this race's log span
    pub race_id: RaceId,
    /// The outcome value
    pub value: R,
    /// Where the value came from
    pub resolution: Resolution,
    /// One entry per candidate task that was cancelled
    pub cancellations: Vec<Cancellation>,
}

impl<R> RaceReport<R> {
    /// Discards the bookkeeping and returns the value.
    pub fn into_value(self) -> R {
        self.value
    }

    /// Returns `true` if the value came from a pre-started task.
    pub fn is_precomputed(&self) -> bool {
        matches!(self.resolution, Resolution::Precomputed { .. })
    }
}

/// Builder for one speculative race.
///
/// Per-call settings override the [`RaceConfig`] the builder starts from.
#[derive(Debug, Clone)]
pub struct Speculation<T, R> {
    candidates: Vec<T>,
    outcome: Outcome<T, R>,
    config: RaceConfig,
}

impl<T, R> Speculation<T, R>
where
    T: PartialEq + Clone + Send + 'static,
    R: Send + 'static,
{
    /// Starts a race over `candidates` (highest priority first).
    pub fn new(candidates: Vec<T>, outcome: Outcome<T, R>) -> Self {
        Self {
            candidates,
            outcome,
            config: RaceConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: RaceConfig) -> Self {
        self.config = config;
        self
    }

    /// Caps the worker pool.
    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.config.max_workers = Some(max_workers);
        self
    }

    /// Chooses between computing fresh and failing on a miss.
    pub fn fallback_on_miss(mut self, fallback_on_miss: bool) -> Self {
        self.config.on_miss = FallbackPolicy::from_flag(fallback_on_miss);
        self
    }

    /// Sets the miss policy directly.
    pub fn on_miss(mut self, policy: FallbackPolicy) -> Self {
        self.config.on_miss = policy;
        self
    }

    /// Candidates in priority order.
    pub fn candidates(&self) -> &[T] {
        &self.candidates
    }

    /// Runs the race and returns the selected outcome.
    ///
    /// Blocks the calling thread until the predicate and, if matched, the
    /// matched outcome complete. Unmatched tasks are cancelled on a best
    /// effort basis and may still be running when this returns.
    ///
    /// Inside an async runtime this stalls the calling worker; wrap it in
    /// `tokio::task::spawn_blocking` there.
    pub fn run(self, predicate: Predicate<T>) -> RaceResult<R, T> {
        self.run_with_report(predicate).map(RaceReport::into_value)
    }

    /// Runs the race and reports how the value was resolved.
    pub fn run_with_report(self, predicate: Predicate<T>) -> RaceResult<RaceReport<R>, T> {
        let Speculation {
            mut candidates,
            outcome,
            config,
        } = self;

        let race_id = RaceId::new();
        let pool_size = config.pool_size(candidates.len())?;
        let _span = tracing::debug_span!(
            "race",
            %race_id,
            candidates = candidates.len(),
            pool_size = pool_size.get()
        )
        .entered();

        let mut executor = Executor::with_name(pool_size, RACE_THREAD_NAME);
        let predicate_handle = predicate.submit(&mut executor)?;
        let handles = match racer::submit_outcomes(&mut executor, &outcome, &candidates) {
            Ok(handles) => handles,
            Err(err) => {
                predicate_handle.cancel();
                executor.shutdown(false);
                return Err(err.into());
            }
        };

        let predicate_output = match predicate_handle.wait() {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(abandon(executor, &handles, source)),
            Err(task_error) => return Err(abandon(executor, &handles, task_error.into())),
        };

        let matched = matcher::find_match(&candidates, &predicate_output);
        let selection = matcher::select(handles, matched);
        let cancellations = selection.cancellations;

        let result = match selection.matched {
            Some((index, handle)) => {
                tracing::debug!(candidate = index, "Predicate matched a pre-started outcome");
                let candidate = candidates.swap_remove(index);
                let value = match handle.wait() {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(source)) => Err(RaceError::OutcomeFailed { candidate, source }),
                    Err(task_error) => Err(RaceError::outcome_failed(candidate, task_error)),
                };
                value.map(|value| (value, Resolution::Precomputed { index }))
            }
            None => config
                .on_miss
                .resolve(&outcome, predicate_output)
                .map(|value| (value, Resolution::Fresh)),
        };

        executor.shutdown(false);

        let (value, resolution) = result?;
        tracing::debug!(?resolution, cancelled = cancellations.len(), "Race resolved");
        Ok(RaceReport {
            race_id,
            value,
            resolution,
            cancellations,
        })
    }
}

fn abandon<T, R>(
    executor: Executor,
    handles: &[racer::OutcomeHandle<R>],
    source: BoxError,
) -> RaceError<T> {
    let prevented = racer::cancel_all(handles);
    tracing::debug!(
        error = %source,
        prevented,
        total = handles.len(),
        "Predicate failed; outcome tasks cancelled"
    );
    executor.shutdown(false);
    RaceError::PredicateFailed { source }
}

/// Races `predicate` against one pre-started `outcome` per candidate.
///
/// Returns the pre-started result for the first candidate equal to the
/// predicate output. On a miss, `config.on_miss` decides between computing
/// `outcome(predicate_output)` fresh and failing with
/// [`RaceError::NoMatchingOutcome`].
///
/// Blocks the calling thread, like [`Speculation::run`].
pub fn race<T, R, F, E>(
    predicate: Predicate<T>,
    outcome: F,
    candidates: Vec<T>,
    config: &RaceConfig,
) -> RaceResult<R, T>
where
    T: PartialEq + Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Result<R, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    Speculation::new(candidates, Outcome::new(outcome))
        .with_config(*config)
        .run(predicate)
}
