//! Matching the predicate output against the candidate list.

use crate::executor::TaskHandle;
use serde::{Deserialize, Serialize};

/// Index of the first candidate equal to `output`.
///
/// Earlier candidates win ties, so duplicate entries never change the
/// selection.
///
/// ```
/// use speculate::matcher::find_match;
///
/// assert_eq!(find_match(&["a", "b", "b"], &"b"), Some(1));
/// assert_eq!(find_match(&["a", "b"], &"z"), None);
/// ```
pub fn find_match<T: PartialEq>(candidates: &[T], output: &T) -> Option<usize> {
    candidates.iter().position(|candidate| candidate == output)
}

/// The cancellation request sent to one unmatched candidate's task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cancellation {
    /// Position of the candidate in the candidate list
    pub index: usize,
    /// `true` if the task was stopped before it started. `false` means it was
    /// already running and its result is discarded.
    pub prevented_start: bool,
}

/// Outcome of splitting the pre-started tasks around the match.
#[derive(Debug)]
pub(crate) struct Selection<R> {
    pub(crate) matched: Option<(usize, TaskHandle<R>)>,
    pub(crate) cancellations: Vec<Cancellation>,
}

/// Keeps the task at `matched` and sends exactly one cancellation request to
/// every other task.
pub(crate) fn select<R>(handles: Vec<TaskHandle<R>>, matched: Option<usize>) -> Selection<R> {
    let mut selected = None;
    let mut cancellations = Vec::with_capacity(handles.len().saturating_sub(1));

    for (index, handle) in handles.into_iter().enumerate() {
        if Some(index) == matched {
            selected = Some((index, handle));
            continue;
        }
        let prevented_start = handle.cancel();
        if !prevented_start {
            tracing::debug!(
                candidate = index,
                "Unmatched outcome already running; its result will be discarded"
            );
        }
        cancellations.push(Cancellation {
            index,
            prevented_start,
        });
    }

    Selection {
        matched: selected,
        cancellations,
    }
}
