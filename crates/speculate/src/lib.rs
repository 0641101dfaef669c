#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Speculate Library
//!
//! Speculative execution primitives: race an expensive predicate against
//! outcomes pre-started for each likely answer, and fire-and-forget
//! background work.

pub mod background;
pub mod config;
pub mod error;
pub mod executor;
pub mod fallback;
pub mod ids;
pub mod matcher;
pub mod predicate;
mod proptests;
pub mod race;
pub mod racer;

// Re-exports for convenience
pub use background::{spawn, spawn_async, spawn_with_args};
pub use config::RaceConfig;
pub use error::{BoxError, ConfigError, RaceError, RaceResult, TaskError};
pub use executor::{Executor, TaskHandle, TaskState};
pub use fallback::FallbackPolicy;
pub use ids::RaceId;
pub use matcher::Cancellation;
pub use predicate::Predicate;
pub use race::{RaceReport, Resolution, Speculation, race};
pub use racer::Outcome;
