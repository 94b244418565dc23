//! Error types for the simulation kernel.
//!
//! Every error carries an [`ErrorCategory`] and a default [`Severity`] so a
//! diagnostic surface can list recent failures without the session
//! crashing. Only [`ErrorCategory::Integrity`] ends a session early.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::Fixed;
use crate::resources::Resource;
use crate::turn::Phase;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all kernel errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Operation is not legal in the current turn phase.
    #[error("{operation} is not allowed during {phase}")]
    InvalidPhase {
        /// Name of the rejected operation.
        operation: String,
        /// Phase the session was in.
        phase: Phase,
    },

    /// The session has ended; no further input is accepted.
    #[error("The game is over")]
    GameOver,

    /// Unknown action identifier.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// No pending event with this identifier.
    #[error("No pending event: {0}")]
    UnknownEvent(String),

    /// Event exists but has no option with this identifier.
    #[error("Event '{event}' has no option '{choice}'")]
    UnknownChoice {
        /// Event identifier.
        event: String,
        /// Rejected option identifier.
        choice: String,
    },

    /// `end_turn` was called with nothing queued.
    #[error("Cannot end turn with an empty action queue")]
    EmptyActionQueue,

    /// A caller-supplied amount is not usable.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Not enough action points.
    #[error("Insufficient action points: need {required}, have {available}")]
    InsufficientActionPoints {
        /// AP required.
        required: u32,
        /// AP available.
        available: u32,
    },

    /// Insufficient resources.
    #[error("Insufficient resources: need {required} {resource}, have {available}")]
    InsufficientResources {
        /// Resource type.
        resource: Resource,
        /// Amount required.
        required: Fixed,
        /// Amount available.
        available: Fixed,
    },

    /// An action precondition does not hold (e.g. firing with no staff).
    #[error("Precondition failed for '{action}': {reason}")]
    PreconditionFailed {
        /// Action identifier.
        action: String,
        /// Why the action cannot run.
        reason: String,
    },

    /// Verification chain can no longer be trusted.
    #[error("Integrity failure: {0}")]
    Integrity(String),

    /// Content or scenario data failed to parse.
    #[error("Failed to parse data '{path}': {message}")]
    DataParseError {
        /// Path or label of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Content or scenario data parsed but is not valid.
    #[error("Invalid content: {0}")]
    InvalidContent(String),
}

impl GameError {
    /// Category tag used by the structured error channel.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidPhase { .. }
            | Self::GameOver
            | Self::UnknownAction(_)
            | Self::UnknownEvent(_)
            | Self::UnknownChoice { .. }
            | Self::EmptyActionQueue
            | Self::InvalidAmount(_) => ErrorCategory::Validation,
            Self::InsufficientActionPoints { .. }
            | Self::InsufficientResources { .. }
            | Self::PreconditionFailed { .. } => ErrorCategory::Resource,
            Self::Integrity(_) => ErrorCategory::Integrity,
            Self::DataParseError { .. } | Self::InvalidContent(_) => ErrorCategory::Content,
        }
    }

    /// Default severity for this error.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::Resource => Severity::Warning,
            ErrorCategory::Content => Severity::Error,
            ErrorCategory::Integrity => Severity::Fatal,
        }
    }

    /// Whether this error terminates the session.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.severity(), Severity::Fatal)
    }
}

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational.
    Info,
    /// Rejected input; session continues.
    Warning,
    /// Failure outside the turn loop (e.g. bad content).
    Error,
    /// Session must end.
    Fatal,
}

/// Coarse category tag for errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Illegal phase transition or unknown identifier.
    Validation,
    /// Not enough AP or resources.
    Resource,
    /// Verification chain failure.
    Integrity,
    /// Content or scenario data problem.
    Content,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation",
            Self::Resource => "resource",
            Self::Integrity => "integrity",
            Self::Content => "content",
        };
        f.write_str(label)
    }
}

/// A logged error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Turn the error occurred on.
    pub turn: u32,
    /// Severity.
    pub severity: Severity,
    /// Category tag.
    pub category: ErrorCategory,
    /// Rendered message.
    pub message: String,
}

impl ErrorRecord {
    /// Build a record from an error.
    #[must_use]
    pub fn from_error(turn: u32, error: &GameError) -> Self {
        Self {
            turn,
            severity: error.severity(),
            category: error.category(),
            message: error.to_string(),
        }
    }
}

/// Default number of records kept by [`ErrorLog`].
pub const ERROR_LOG_CAPACITY: usize = 64;

/// Bounded log of recent errors.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    records: VecDeque<ErrorRecord>,
    capacity: usize,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::with_capacity(ERROR_LOG_CAPACITY)
    }
}

impl ErrorLog {
    /// Create a log keeping at most `capacity` records.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Append a record, evicting the oldest when full.
    pub fn push(&mut self, record: ErrorRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records.iter()
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent record.
    #[must_use]
    pub fn last(&self) -> Option<&ErrorRecord> {
        self.records.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_and_severity() {
        let err = GameError::UnknownAction("teleport".into());
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.severity(), Severity::Warning);

        let err = GameError::InsufficientActionPoints {
            required: 2,
            available: 1,
        };
        assert_eq!(err.category(), ErrorCategory::Resource);
        assert!(!err.is_fatal());

        let err = GameError::Integrity("gap".into());
        assert_eq!(err.severity(), Severity::Fatal);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_resource_error_message_has_payload() {
        let err = GameError::InsufficientResources {
            resource: Resource::Money,
            required: Fixed::from_num(25_000),
            available: Fixed::from_num(1_000),
        };
        let msg = err.to_string();
        assert!(msg.contains("25000"));
        assert!(msg.contains("1000"));
        assert!(msg.contains("money"));
    }

    #[test]
    fn test_error_log_evicts_oldest() {
        let mut log = ErrorLog::with_capacity(2);
        for turn in 0..3 {
            log.push(ErrorRecord::from_error(turn, &GameError::EmptyActionQueue));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.iter().next().map(|r| r.turn), Some(1));
        assert_eq!(log.last().map(|r| r.turn), Some(2));
    }
}
