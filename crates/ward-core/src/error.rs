//! The lifecycle error taxonomy.
//!
//! Five categories: not-found, illegal transition, failed precondition,
//! no-op request, persistence failure. The first four are expected,
//! recoverable outcomes an operator can act on; a persistence failure means
//! the unit of work was rolled back and the caller should report a generic
//! processing failure upstream. No category ever advances the history
//! cursor, marks a command executed, or inserts into the snapshot store.

use crate::model::ticket::TicketId;
use crate::port::StoreError;
use crate::state::{Status, UnknownStatus};
use thiserror::Error;

/// Machine-readable error codes for operator tooling and transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    TicketNotFound,
    IllegalTransition,
    PreconditionFailed,
    NoOpRequested,
    UnknownStatus,
    PersistenceFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::TicketNotFound => "E2001",
            Self::IllegalTransition => "E2002",
            Self::PreconditionFailed => "E2003",
            Self::NoOpRequested => "E2004",
            Self::UnknownStatus => "E2005",
            Self::PersistenceFailure => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::TicketNotFound => "Ticket not found",
            Self::IllegalTransition => "Illegal status transition",
            Self::PreconditionFailed => "Command precondition failed",
            Self::NoOpRequested => "Nothing to do",
            Self::UnknownStatus => "Unknown status name",
            Self::PersistenceFailure => "Processing failed",
        }
    }

    /// Optional remediation hint surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::TicketNotFound => Some("Check the ticket id with `ward list`."),
            Self::IllegalTransition => {
                Some("Inspect the current status and its legal successors with `ward show`.")
            }
            Self::PreconditionFailed => None,
            Self::NoOpRequested => None,
            Self::UnknownStatus => {
                Some("Use one of: pending, reviewed, assigned, in_progress, completed, cancelled.")
            }
            Self::PersistenceFailure => Some("The operation was rolled back. Retry once."),
        }
    }
}

/// Error returned by the command, snapshot, and service layers.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("ticket '{0}' not found")]
    NotFound(TicketId),

    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition { from: Status, to: Status },

    #[error("precondition failed: {reason}")]
    PreconditionFailed { reason: String },

    #[error("nothing to do: {0}")]
    NothingToDo(&'static str),

    #[error("unknown snapshot key '{key}'")]
    UnknownSnapshot { key: String },

    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatus),

    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
}

impl LifecycleError {
    /// The taxonomy category of this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::TicketNotFound,
            Self::IllegalTransition { .. } => ErrorCode::IllegalTransition,
            Self::PreconditionFailed { .. } => ErrorCode::PreconditionFailed,
            Self::NothingToDo(_) | Self::UnknownSnapshot { .. } => ErrorCode::NoOpRequested,
            Self::UnknownStatus(_) => ErrorCode::UnknownStatus,
            Self::Store(_) => ErrorCode::PersistenceFailure,
        }
    }

    /// Whether this is an expected, recoverable outcome (everything except
    /// a persistence failure).
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}
