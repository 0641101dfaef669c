//! Handling of predicate outputs that match no candidate.

use crate::error::{RaceError, RaceResult, TaskError, panic_message};
use crate::racer::Outcome;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};

/// What a race does when the predicate output is not among the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Compute `outcome(predicate_output)` on the calling thread.
    #[default]
    ComputeFresh,
    /// Fail with [`RaceError::NoMatchingOutcome`] carrying the output.
    Fail,
}

impl FallbackPolicy {
    /// Maps the boolean `fallback_on_miss` switch to a policy.
    pub fn from_flag(fallback_on_miss: bool) -> Self {
        if fallback_on_miss {
            FallbackPolicy::ComputeFresh
        } else {
            FallbackPolicy::Fail
        }
    }

    /// Returns `true` if a miss is computed fresh.
    pub fn computes_fresh(self) -> bool {
        matches!(self, FallbackPolicy::ComputeFresh)
    }

    /// Applies the policy to an unmatched predicate output.
    ///
    /// The fresh computation runs synchronously; a panic inside it is
    /// reported as an outcome failure like one on the pool would be.
    pub(crate) fn resolve<T, R>(self, outcome: &Outcome<T, R>, predicate_output: T) -> RaceResult<R, T>
    where
        T: Clone,
    {
        match self {
            FallbackPolicy::ComputeFresh => {
                tracing::debug!("No candidate matched; computing outcome fresh");
                let input = predicate_output.clone();
                match panic::catch_unwind(AssertUnwindSafe(|| outcome.call(input))) {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(source)) => Err(RaceError::OutcomeFailed {
                        candidate: predicate_output,
                        source,
                    }),
                    Err(payload) => Err(RaceError::outcome_failed(
                        predicate_output,
                        TaskError::Panicked {
                            message: panic_message(payload.as_ref()),
                        },
                    )),
                }
            }
            FallbackPolicy::Fail => {
                tracing::debug!("No candidate matched; fallback disabled");
                Err(RaceError::NoMatchingOutcome { predicate_output })
            }
        }
    }
}
