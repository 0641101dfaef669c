//! Identifier for a single race invocation.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for one race, attached to its tracing span.
///
/// ```
/// use speculate::RaceId;
///
/// let id = RaceId::new();
/// println!("Race ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RaceId(Uuid);

impl RaceId {
    /// Creates a new random race ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
