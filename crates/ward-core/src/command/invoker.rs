//! Bounded, branch-cutting command history.
//!
//! The invoker owns an ordered sequence of commands plus a cursor counting
//! how many of them are currently applied. A new execute after one or more
//! undos discards everything past the cursor (no redo branching); the
//! sequence is capped at [`HISTORY_CAPACITY`] entries, evicting the oldest
//! and shifting the cursor to preserve relative position.
//!
//! Invariant after every call: `applied <= history.len() <= HISTORY_CAPACITY`.
//! (`applied` is `currentPosition + 1` in cursor terms; 0 means nothing to
//! undo.) No failing call moves the cursor or mutates the sequence.
//!
//! Not concurrency-safe by design: one invoker belongs to one logical admin
//! session.

use crate::audit::Effects;
use crate::command::TicketCommand;
use crate::error::LifecycleError;
use crate::port::TicketStore;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

/// Maximum number of commands retained for undo/redo.
pub const HISTORY_CAPACITY: usize = 50;

/// Read-only view of one recorded command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub description: String,
    pub data: serde_json::Value,
    pub executed: bool,
}

/// Executes commands and owns their undo/redo history.
#[derive(Debug, Default)]
pub struct CommandInvoker {
    history: VecDeque<TicketCommand>,
    /// Number of history entries currently applied (cursor + 1).
    applied: usize,
}

impl CommandInvoker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute `cmd` and record it. On success the redo branch (entries past
    /// the cursor) is discarded first, then the command is appended; if the
    /// history exceeds capacity the oldest entry is evicted. On failure
    /// history and cursor are untouched.
    ///
    /// # Errors
    ///
    /// Whatever [`TicketCommand::execute`] returns.
    pub fn execute(
        &mut self,
        mut cmd: TicketCommand,
        store: &mut dyn TicketStore,
        fx: &Effects<'_>,
    ) -> Result<(), LifecycleError> {
        cmd.execute(store, fx)?;

        // Branch cut: a new command after undos invalidates the redo tail.
        let cut = self.history.len() - self.applied;
        if cut > 0 {
            debug!(discarded = cut, "discarding redo branch");
        }
        self.history.truncate(self.applied);
        self.history.push_back(cmd);
        self.applied += 1;

        if self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
            self.applied -= 1;
        }
        debug_assert!(self.applied <= self.history.len());
        debug_assert!(self.history.len() <= HISTORY_CAPACITY);
        Ok(())
    }

    /// Undo the most recently applied command. The cursor moves only when
    /// the command reports success.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NothingToDo`] when nothing is applied; otherwise
    /// whatever [`TicketCommand::undo`] returns.
    pub fn undo(
        &mut self,
        store: &mut dyn TicketStore,
        fx: &Effects<'_>,
    ) -> Result<(), LifecycleError> {
        if self.applied == 0 {
            return Err(LifecycleError::NothingToDo("no command to undo"));
        }
        let cmd = &mut self.history[self.applied - 1];
        if cmd.undo(store, fx)? {
            self.applied -= 1;
            Ok(())
        } else {
            Err(LifecycleError::NothingToDo("command was not executed"))
        }
    }

    /// Redo the next undone command, advancing the cursor only on success.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NothingToDo`] when the cursor is already at the
    /// end; otherwise whatever [`TicketCommand::redo`] returns.
    pub fn redo(
        &mut self,
        store: &mut dyn TicketStore,
        fx: &Effects<'_>,
    ) -> Result<(), LifecycleError> {
        if self.applied == self.history.len() {
            return Err(LifecycleError::NothingToDo("no command to redo"));
        }
        let cmd = &mut self.history[self.applied];
        if cmd.redo(store, fx)? {
            self.applied += 1;
            Ok(())
        } else {
            Err(LifecycleError::NothingToDo("command refused redo"))
        }
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.applied < self.history.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Recorded commands oldest-first.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history
            .iter()
            .map(|cmd| HistoryEntry {
                description: cmd.describe(),
                data: cmd.serialize(),
                executed: cmd.is_executed(),
            })
            .collect()
    }

    /// Drop all history and reset the cursor.
    pub fn clear(&mut self) {
        self.history.clear();
        self.applied = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandInvoker, HISTORY_CAPACITY};
    use crate::audit::Effects;
    use crate::command::TicketCommand;
    use crate::error::ErrorCode;
    use crate::model::ticket::Priority;
    use crate::port::TicketStore;
    use crate::state::Status;
    use crate::store::memory::InMemoryStore;

    fn seeded() -> (InMemoryStore, crate::model::ticket::TicketId) {
        let mut store = InMemoryStore::new();
        let id = store.seed_ticket(
            "Graffiti on underpass",
            "South wall needs repainting",
            "Underpass at Mill Ln",
            Priority::Low,
        );
        (store, id)
    }

    #[test]
    fn undo_on_empty_history_fails_fast() {
        let (mut store, _id) = seeded();
        let fx = Effects::disabled();
        let mut invoker = CommandInvoker::new();
        let err = invoker.undo(&mut store, &fx).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoOpRequested);
    }

    #[test]
    fn redo_at_end_of_history_fails_fast() {
        let (mut store, id) = seeded();
        let fx = Effects::disabled();
        let mut invoker = CommandInvoker::new();
        invoker
            .execute(
                TicketCommand::update_status(id, Status::Reviewed, "admin-1", None),
                &mut store,
                &fx,
            )
            .unwrap();
        let err = invoker.redo(&mut store, &fx).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoOpRequested);
    }

    #[test]
    fn failed_execute_records_nothing() {
        let (mut store, id) = seeded();
        let fx = Effects::disabled();
        let mut invoker = CommandInvoker::new();
        let err = invoker
            .execute(
                TicketCommand::update_status(id.clone(), Status::Completed, "admin-1", None),
                &mut store,
                &fx,
            )
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::IllegalTransition);
        assert!(invoker.is_empty());
        assert!(!invoker.can_undo());
        assert_eq!(store.find(&id).unwrap().unwrap().status, Status::Pending);
    }

    #[test]
    fn new_execute_after_undo_cuts_the_redo_branch() {
        let (mut store, id) = seeded();
        let fx = Effects::disabled();
        let mut invoker = CommandInvoker::new();

        invoker
            .execute(
                TicketCommand::update_status(id.clone(), Status::Reviewed, "admin-1", None),
                &mut store,
                &fx,
            )
            .unwrap();
        invoker
            .execute(
                TicketCommand::update_status(id.clone(), Status::Assigned, "admin-1", None),
                &mut store,
                &fx,
            )
            .unwrap();
        invoker.undo(&mut store, &fx).unwrap();
        assert!(invoker.can_redo());

        // New command from `reviewed`: the undone assignment is gone for good.
        invoker
            .execute(
                TicketCommand::update_status(id.clone(), Status::Cancelled, "admin-1", None),
                &mut store,
                &fx,
            )
            .unwrap();
        assert!(!invoker.can_redo());
        assert_eq!(invoker.len(), 2);
        assert_eq!(store.find(&id).unwrap().unwrap().status, Status::Cancelled);
    }

    #[test]
    fn history_is_bounded_and_evicts_oldest() {
        let (mut store, id) = seeded();
        let fx = Effects::disabled();
        let mut invoker = CommandInvoker::new();

        // Priority flips alternate so every execute passes its guard.
        let mut levels = [Priority::High, Priority::Low].iter().cycle();
        for _ in 0..(HISTORY_CAPACITY + 5) {
            let level = *levels.next().expect("cycle never ends");
            invoker
                .execute(
                    TicketCommand::update_priority(id.clone(), level, "admin-1", None),
                    &mut store,
                    &fx,
                )
                .unwrap();
        }
        assert_eq!(invoker.len(), HISTORY_CAPACITY);
        assert!(invoker.can_undo());
        assert!(!invoker.can_redo());

        // Only the retained window is undoable.
        let mut undone = 0;
        while invoker.can_undo() {
            invoker.undo(&mut store, &fx).unwrap();
            undone += 1;
        }
        assert_eq!(undone, HISTORY_CAPACITY);
    }

    #[test]
    fn history_listing_is_oldest_first() {
        let (mut store, id) = seeded();
        let fx = Effects::disabled();
        let mut invoker = CommandInvoker::new();
        invoker
            .execute(
                TicketCommand::update_status(id.clone(), Status::Reviewed, "admin-1", None),
                &mut store,
                &fx,
            )
            .unwrap();
        invoker
            .execute(
                TicketCommand::update_priority(id, Priority::High, "admin-1", None),
                &mut store,
                &fx,
            )
            .unwrap();

        let listing = invoker.history();
        assert_eq!(listing.len(), 2);
        assert!(listing[0].description.contains("status"));
        assert!(listing[1].description.contains("priority"));
        assert!(listing.iter().all(|e| e.executed));
    }

    #[test]
    fn clear_resets_history_and_cursor() {
        let (mut store, id) = seeded();
        let fx = Effects::disabled();
        let mut invoker = CommandInvoker::new();
        invoker
            .execute(
                TicketCommand::update_status(id, Status::Reviewed, "admin-1", None),
                &mut store,
                &fx,
            )
            .unwrap();
        invoker.clear();
        assert!(invoker.is_empty());
        assert!(!invoker.can_undo());
        assert!(!invoker.can_redo());
    }

    #[test]
    fn undo_then_redo_round_trips_record_state() {
        let (mut store, id) = seeded();
        let fx = Effects::disabled();
        let mut invoker = CommandInvoker::new();
        invoker
            .execute(
                TicketCommand::assign_technician(id.clone(), "tech-3", "admin-1", None),
                &mut store,
                &fx,
            )
            .unwrap();
        invoker.undo(&mut store, &fx).unwrap();
        assert_eq!(store.find(&id).unwrap().unwrap().status, Status::Pending);
        invoker.redo(&mut store, &fx).unwrap();
        let record = store.find(&id).unwrap().unwrap();
        assert_eq!(record.status, Status::Assigned);
        assert_eq!(record.assigned_technician_id.as_deref(), Some("tech-3"));
    }
}
