//! The upward control surface: one facade a transport binds to.
//!
//! A [`TicketDesk`] is the single logical caller context of the subsystem:
//! it owns the store handle, the command history, and the snapshot store for
//! one admin session. Transports (CLI session, HTTP handler, test harness)
//! translate their requests into [`CommandRequest`] values and call the desk
//! methods; nothing below this layer knows the transport exists.

use crate::audit::{AuditSink, Effects, TracingAuditSink};
use crate::command::{CommandInvoker, HistoryEntry, TicketCommand};
use crate::error::LifecycleError;
use crate::model::ticket::{Priority, TicketId};
use crate::port::TicketStore;
use crate::snapshot::{SnapshotOriginator, SnapshotStore, SnapshotSummary, TicketMemento};
use crate::state::{EntryHook, LogEntryHook, Status};
use serde::{Deserialize, Serialize};

/// A named mutating admin action, as a transport submits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandRequest {
    AssignTechnician {
        ticket_id: TicketId,
        technician_id: String,
        actor_id: String,
        #[serde(default)]
        note: Option<String>,
    },
    UpdateStatus {
        ticket_id: TicketId,
        new_status: Status,
        actor_id: String,
        #[serde(default)]
        note: Option<String>,
    },
    UpdatePriority {
        ticket_id: TicketId,
        new_priority: Priority,
        actor_id: String,
        #[serde(default)]
        note: Option<String>,
    },
}

impl CommandRequest {
    fn into_command(self) -> TicketCommand {
        match self {
            Self::AssignTechnician {
                ticket_id,
                technician_id,
                actor_id,
                note,
            } => TicketCommand::assign_technician(ticket_id, technician_id, actor_id, note),
            Self::UpdateStatus {
                ticket_id,
                new_status,
                actor_id,
                note,
            } => TicketCommand::update_status(ticket_id, new_status, actor_id, note),
            Self::UpdatePriority {
                ticket_id,
                new_priority,
                actor_id,
                note,
            } => TicketCommand::update_priority(ticket_id, new_priority, actor_id, note),
        }
    }
}

/// One admin session's view of the lifecycle subsystem.
pub struct TicketDesk<S: TicketStore> {
    store: S,
    invoker: CommandInvoker,
    snapshots: SnapshotStore,
    audit: Box<dyn AuditSink>,
    entry: Box<dyn EntryHook>,
    snapshot_seq: u64,
}

impl<S: TicketStore> TicketDesk<S> {
    /// Desk with the default sinks: tracing audit, log-line entry hook.
    pub fn new(store: S) -> Self {
        Self::with_sinks(store, Box::new(TracingAuditSink), Box::new(LogEntryHook))
    }

    /// Desk with caller-provided audit sink and entry hook.
    pub fn with_sinks(store: S, audit: Box<dyn AuditSink>, entry: Box<dyn EntryHook>) -> Self {
        Self {
            store,
            invoker: CommandInvoker::new(),
            snapshots: SnapshotStore::new(),
            audit,
            entry,
            snapshot_seq: 0,
        }
    }

    /// Direct access to the store handle, for transport-level reads and
    /// record creation outside the lifecycle surface.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Execute a named command and record it for undo.
    ///
    /// # Errors
    ///
    /// The full [`LifecycleError`] taxonomy; on error nothing is recorded.
    pub fn execute_named(&mut self, request: CommandRequest) -> Result<(), LifecycleError> {
        let fx = Effects::new(self.audit.as_ref(), self.entry.as_ref());
        self.invoker
            .execute(request.into_command(), &mut self.store, &fx)
    }

    /// Undo the most recent applied command.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NothingToDo`] when the history cursor is at the
    /// start; otherwise the command's own failure.
    pub fn undo_last(&mut self) -> Result<(), LifecycleError> {
        let fx = Effects::new(self.audit.as_ref(), self.entry.as_ref());
        self.invoker.undo(&mut self.store, &fx)
    }

    /// Redo the most recently undone command.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NothingToDo`] when there is no redo branch;
    /// otherwise the command's own failure.
    pub fn redo_last(&mut self) -> Result<(), LifecycleError> {
        let fx = Effects::new(self.audit.as_ref(), self.entry.as_ref());
        self.invoker.redo(&mut self.store, &fx)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.invoker.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.invoker.can_redo()
    }

    /// Recorded commands oldest-first.
    #[must_use]
    pub fn list_history(&self) -> Vec<HistoryEntry> {
        self.invoker.history()
    }

    /// Drop the command history (snapshots are unaffected).
    pub fn clear_history(&mut self) {
        self.invoker.clear();
    }

    /// Capture a snapshot of the ticket and store it under a generated
    /// `snap-<n>` key, evicting the oldest snapshot at capacity.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotFound`] for an unknown ticket;
    /// [`LifecycleError::Store`] on persistence failure. On error nothing
    /// is inserted.
    pub fn create_snapshot(
        &mut self,
        ticket_id: TicketId,
        label: Option<String>,
    ) -> Result<String, LifecycleError> {
        let label = label.unwrap_or_else(|| format!("snapshot of {ticket_id}"));
        let originator = SnapshotOriginator::new(ticket_id);
        let memento = originator.capture(&mut self.store, label)?;
        self.snapshot_seq += 1;
        let key = format!("snap-{}", self.snapshot_seq);
        self.snapshots.save(key.clone(), memento);
        Ok(key)
    }

    /// Snapshot summaries oldest-first.
    #[must_use]
    pub fn list_snapshots(&self) -> Vec<SnapshotSummary> {
        self.snapshots.list()
    }

    /// The most recently inserted snapshot.
    #[must_use]
    pub fn latest_snapshot(&self) -> Option<(&str, &TicketMemento)> {
        self.snapshots.latest()
    }

    /// Restore the ticket referenced by the stored snapshot.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::UnknownSnapshot`] for an unknown key, plus the
    /// restore taxonomy of [`SnapshotOriginator::restore`].
    pub fn restore_snapshot(&mut self, key: &str, actor_id: &str) -> Result<(), LifecycleError> {
        let memento = self
            .snapshots
            .get(key)
            .cloned()
            .ok_or_else(|| LifecycleError::UnknownSnapshot {
                key: key.to_string(),
            })?;
        let originator = SnapshotOriginator::new(memento.ticket_id().clone());
        let fx = Effects::new(self.audit.as_ref(), self.entry.as_ref());
        originator.restore(&mut self.store, &fx, &memento, actor_id)
    }

    /// Remove a stored snapshot; `false` when the key is unknown.
    pub fn delete_snapshot(&mut self, key: &str) -> bool {
        self.snapshots.remove(key)
    }
}
