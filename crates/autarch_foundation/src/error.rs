//! Error types for the Autarch system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//! Condition failures are not errors; they are reported as data by the engine.

use std::fmt;

use thiserror::Error;

use crate::ids::{EntityId, StationId};
use crate::snapshot::SnapshotVersion;

/// The main error type for Autarch operations.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration(message.into()))
    }

    /// Creates a stale snapshot error.
    #[must_use]
    pub fn stale_snapshot(expected: SnapshotVersion, actual: SnapshotVersion) -> Self {
        Self::new(ErrorKind::StaleSnapshot { expected, actual })
    }

    /// Creates an entity not found error.
    #[must_use]
    pub fn entity_not_found(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityNotFound(id))
    }

    /// Creates a station not found error.
    #[must_use]
    pub fn station_not_found(id: StationId) -> Self {
        Self::new(ErrorKind::StationNotFound(id))
    }

    /// Creates a reservation conflict error.
    #[must_use]
    pub fn reservation_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReservationConflict(message.into()))
    }

    /// Creates an action failure error.
    #[must_use]
    pub fn action_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ActionFailed(message.into()))
    }

    /// Creates a recovery failure error wrapping the error that triggered recovery.
    #[must_use]
    pub fn recovery_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RecoveryFailed(message.into()))
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(after_ms: u64) -> Self {
        Self::new(ErrorKind::Timeout { after_ms })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, ErrorKind::Configuration(_))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Clone, Error)]
pub enum ErrorKind {
    /// Invalid or incomplete rule definition, detected at load time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A handle or view was used against a snapshot it was not taken from.
    #[error("stale snapshot: handle is from {expected}, current is {actual}")]
    StaleSnapshot {
        /// The version the handle was taken from.
        expected: SnapshotVersion,
        /// The version it was resolved against.
        actual: SnapshotVersion,
    },

    /// Entity was not found in the snapshot.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Station was not found in the snapshot.
    #[error("station not found: {0}")]
    StationNotFound(StationId),

    /// A constraint could not be satisfied by the ledger.
    #[error("reservation conflict: {0}")]
    ReservationConflict(String),

    /// An action failed while being applied to the world.
    #[error("action failed: {0}")]
    ActionFailed(String),

    /// A recovery handler failed; never retried.
    #[error("recovery failed: {0}")]
    RecoveryFailed(String),

    /// An operation lost its race against a deadline.
    #[error("timed out after {after_ms}ms")]
    Timeout {
        /// The deadline that elapsed, in milliseconds.
        after_ms: u64,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Rule or goal name.
    pub rule: Option<String>,
    /// Host tick at which the error occurred.
    pub tick: Option<u64>,
    /// Stack of enclosing declarations or sequences.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rule name.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Sets the tick.
    #[must_use]
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "in rule {rule}")?;
            if let Some(tick) = self.tick {
                write!(f, " at tick {tick}")?;
            }
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}

/// Result type alias using the Autarch error.
pub type Result<T> = std::result::Result<T, Error>;
