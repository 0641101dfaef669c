//! Race configuration.
//!
//! [`RaceConfig`] makes the pool-sizing default explicit: without a
//! `max_workers` bound a race gets one worker per candidate plus one slot
//! reserved for the predicate. Every field can be overridden per call through
//! [`Speculation`](crate::Speculation).
//!
//! Configs can be loaded from TOML:
//!
//! ```toml
//! max_workers = 4
//! on_miss = "fail"
//! ```

use crate::error::ConfigError;
use crate::fallback::FallbackPolicy;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;

/// Tunables for a speculative race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RaceConfig {
    /// Upper bound on worker threads. `None` means `candidates + 1`.
    pub max_workers: Option<usize>,

    /// What to do when the predicate output matches no candidate.
    pub on_miss: FallbackPolicy,
}

impl RaceConfig {
    /// Creates the default configuration (unbounded pool, compute fresh on miss).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker bound.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    /// Sets the miss policy.
    pub fn with_on_miss(mut self, on_miss: FallbackPolicy) -> Self {
        self.on_miss = on_miss;
        self
    }

    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RaceConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "Loaded race config");
        Ok(config)
    }

    /// Checks that every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == Some(0) {
            return Err(ConfigError::invalid("max_workers must be at least 1"));
        }
        Ok(())
    }

    /// Number of workers for a race over `candidates` candidates.
    ///
    /// `min(max_workers, candidates + 1)` when bounded, else `candidates + 1`.
    pub fn pool_size(&self, candidates: usize) -> Result<NonZeroUsize, ConfigError> {
        self.validate()?;
        let wanted = candidates.saturating_add(1);
        let size = match self.max_workers {
            Some(max) => max.min(wanted),
            None => wanted,
        };
        NonZeroUsize::new(size).ok_or_else(|| ConfigError::invalid("pool size must be non-zero"))
    }
}
