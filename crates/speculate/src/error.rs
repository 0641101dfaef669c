//! Error types for speculative races.

/// Boxed error produced by predicate and outcome functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while racing a predicate against its candidates.
///
/// `T` is the candidate / predicate-output type, so payload-carrying
/// variants hand the value back to the caller without string parsing.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RaceError<T> {
    /// The predicate failed or panicked. Every outcome task was cancelled.
    #[error("Predicate failed: {source}")]
    PredicateFailed {
        /// Original predicate failure
        #[source]
        source: BoxError,
    },

    /// The selected outcome computation failed.
    #[error("Outcome for candidate {candidate:?} failed: {source}")]
    OutcomeFailed {
        /// Candidate whose outcome was being computed
        candidate: T,
        /// Original outcome failure
        #[source]
        source: BoxError,
    },

    /// The predicate output matched no candidate and fallback is disabled.
    #[error("Predicate output {predicate_output:?} not found in candidates")]
    NoMatchingOutcome {
        /// Value the predicate produced
        predicate_output: T,
    },

    /// Invalid race configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A worker thread could not be started.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` alias for race operations: `R` is the outcome
/// value, `T` the candidate type.
pub type RaceResult<R, T> = std::result::Result<R, RaceError<T>>;

impl<T> RaceError<T> {
    /// Creates a predicate failure from any boxable error.
    pub fn predicate_failed<E: Into<BoxError>>(source: E) -> Self {
        RaceError::PredicateFailed {
            source: source.into(),
        }
    }

    /// Creates an outcome failure for `candidate`.
    pub fn outcome_failed<E: Into<BoxError>>(candidate: T, source: E) -> Self {
        RaceError::OutcomeFailed {
            candidate,
            source: source.into(),
        }
    }

    /// Returns `true` if the predicate output matched no candidate.
    pub fn is_no_match(&self) -> bool {
        matches!(self, RaceError::NoMatchingOutcome { .. })
    }

    /// Returns the unmatched predicate output, if this is a miss.
    pub fn predicate_output(&self) -> Option<&T> {
        match self {
            RaceError::NoMatchingOutcome { predicate_output } => Some(predicate_output),
            _ => None,
        }
    }

    /// Consumes the error and returns the unmatched predicate output, if any.
    pub fn into_predicate_output(self) -> Option<T> {
        match self {
            RaceError::NoMatchingOutcome { predicate_output } => Some(predicate_output),
            _ => None,
        }
    }

    /// Returns the candidate whose outcome failed, if any.
    pub fn candidate(&self) -> Option<&T> {
        match self {
            RaceError::OutcomeFailed { candidate, .. } => Some(candidate),
            _ => None,
        }
    }

    /// Maps the candidate payload to another type, keeping the variant.
    pub fn map_candidate<U, F>(self, f: F) -> RaceError<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            RaceError::PredicateFailed { source } => RaceError::PredicateFailed { source },
            RaceError::OutcomeFailed { candidate, source } => RaceError::OutcomeFailed {
                candidate: f(candidate),
                source,
            },
            RaceError::NoMatchingOutcome { predicate_output } => RaceError::NoMatchingOutcome {
                predicate_output: f(predicate_output),
            },
            RaceError::Config(err) => RaceError::Config(err),
            RaceError::Io(err) => RaceError::Io(err),
        }
    }
}

/// Failure of a single pool task, as seen through its handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TaskError {
    /// The task was cancelled before a worker picked it up.
    #[error("Task was cancelled before it started")]
    Cancelled,

    /// The task's closure panicked.
    #[error("Task panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text
        message: String,
    },
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for [`RaceConfig`](crate::RaceConfig)
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid config: {message}")]
    Invalid {
        /// What is wrong
        message: String,
    },
}

impl ConfigError {
    /// Creates a new validation error.
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        ConfigError::Invalid {
            message: message.into(),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
