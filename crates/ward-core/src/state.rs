//! The ticket lifecycle state model.
//!
//! Six named states with a fixed successor table:
//!
//! | state | may move to |
//! |---|---|
//! | `pending` | `reviewed`, `cancelled` |
//! | `reviewed` | `assigned`, `cancelled` |
//! | `assigned` | `in_progress`, `reviewed`, `cancelled` |
//! | `in_progress` | `completed`, `assigned`, `cancelled` |
//! | `completed` | (terminal) |
//! | `cancelled` | (terminal) |
//!
//! The table is a pure function of the state name — a static match, built
//! once into the binary, never constructed per call. Legality of a status
//! write is enforced by the transition layer (commands and
//! [`crate::port::TicketStore::transition_status`] implementations), not by
//! raw storage.

use crate::model::ticket::TicketRecord;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::info;

/// The six lifecycle states of a service ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Reviewed,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl Status {
    /// All states in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Reviewed,
        Self::Assigned,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Short operator-facing description of what the state means.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Pending => "Submitted, awaiting review",
            Self::Reviewed => "Reviewed, awaiting technician assignment",
            Self::Assigned => "Technician assigned, work not yet started",
            Self::InProgress => "Technician actively working the ticket",
            Self::Completed => "Work finished and verified",
            Self::Cancelled => "Closed without completing the work",
        }
    }

    /// The ordered set of states this state may legally move to.
    ///
    /// Never contains `self`; empty for the two terminal states.
    #[must_use]
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Reviewed, Self::Cancelled],
            Self::Reviewed => &[Self::Assigned, Self::Cancelled],
            Self::Assigned => &[Self::InProgress, Self::Reviewed, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Assigned, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    /// Whether a transition from `self` to `target` is allowed.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.successors().contains(&target)
    }

    /// `completed` and `cancelled` admit no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status name does not match any lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown status '{}': expected one of pending, reviewed, assigned, \
             in_progress, completed, cancelled",
            self.raw
        )
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "reviewed" => Ok(Self::Reviewed),
            "assigned" => Ok(Self::Assigned),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(UnknownStatus { raw: s.to_string() }),
        }
    }
}

/// Advisory hook fired after a ticket durably enters a new state.
///
/// Implementations may audit, notify, or log, but cannot fail a transition:
/// the hook runs only after the write is applied, returns nothing, and is
/// expected to swallow (and log) its own failures.
pub trait EntryHook {
    /// Called with the post-transition record.
    fn on_enter(&self, record: &TicketRecord);
}

/// Default hook: structured log line per state entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEntryHook;

impl EntryHook for LogEntryHook {
    fn on_enter(&self, record: &TicketRecord) {
        info!(
            ticket_id = %record.id,
            status = %record.status,
            "ticket entered state: {}",
            record.status.description()
        );
    }
}

/// Hook that does nothing. Useful for tests and headless embeddings.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEntryHook;

impl EntryHook for NullEntryHook {
    fn on_enter(&self, _record: &TicketRecord) {}
}
