//! Error types for constraint configuration, evaluation and body resolution

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T, E = ConstraintError> = std::result::Result<T, E>;

/// Errors raised while configuring or evaluating constraints
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConstraintError {
    /// Malformed constraint tree, bad bounds or a missing target identifier.
    /// Always raised before evaluation begins.
    #[error("invalid constraint configuration: {reason}")]
    Configuration {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// The configuration document could not be parsed.
    #[error("failed to parse constraint configuration: {0}")]
    Parse(String),

    /// A body could not be located by any enabled tier.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A timestamp is not part of the evaluated time grid.
    #[error("time {time} is outside the evaluated time grid")]
    LookupBounds {
        /// The requested instant.
        time: DateTime<Utc>,
    },

    /// A time index is beyond the end of the time grid.
    #[error("time index {index} is out of range for a grid of {len} samples")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Grid length.
        len: usize,
    },

    /// The ephemeris context cannot supply data a constraint needs.
    #[error("ephemeris data unavailable: {0}")]
    MissingData(String),

    /// Evaluation was cancelled through its cancellation token.
    #[error("evaluation cancelled")]
    Cancelled,
}

impl ConstraintError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        ConstraintError::Configuration {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ConstraintError {
    fn from(err: serde_json::Error) -> Self {
        ConstraintError::Parse(err.to_string())
    }
}

/// Failure of the tiered body lookup
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResolutionError {
    /// No enabled tier knows the body.
    #[error("body '{body}' not found")]
    BodyNotFound {
        /// Normalised body identifier.
        body: String,
    },

    /// The body is known but has no data at the requested instant.
    #[error("no ephemeris for body '{body}' at {time}")]
    OutOfRange {
        /// Normalised body identifier.
        body: String,
        /// First instant without data.
        time: DateTime<Utc>,
    },

    /// Local data was insufficient and the caller did not allow network lookups.
    #[error("body '{body}' not available locally and network fallback is disabled")]
    NetworkDisabled {
        /// Normalised body identifier.
        body: String,
    },

    /// The network request failed.
    #[error("network lookup for '{body}' failed: {message}")]
    Network {
        /// Normalised body identifier.
        body: String,
        /// Transport or HTTP error text.
        message: String,
    },

    /// The network request did not complete within the allowed time.
    #[error("network lookup for '{body}' timed out after {millis} ms")]
    Timeout {
        /// Normalised body identifier.
        body: String,
        /// Timeout that elapsed.
        millis: u128,
    },

    /// The service answered with something that could not be parsed.
    #[error("invalid ephemeris response: {0}")]
    InvalidResponse(String),
}
