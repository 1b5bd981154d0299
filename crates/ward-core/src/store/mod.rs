//! Persistence Port adapters.
//!
//! Two implementations of [`crate::port::TicketStore`]: an in-memory map for
//! tests and demos, and the SQLite record store the CLI runs against. Both
//! enforce the same `transition_status` contract: successor-table validation
//! plus an appended history note.

pub mod memory;
pub mod sqlite;

use crate::model::ticket::TicketId;
use crate::state::Status;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One stored audit note from a validated status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredNote {
    pub ticket_id: TicketId,
    pub status: Status,
    pub actor_id: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
