//! Reversible admin operations over one ticket.
//!
//! A [`TicketCommand`] is a closed tagged union of the mutating admin
//! actions. Each variant carries its immutable intent (ticket id, new value,
//! actor, note) plus undo-capture state populated only by a successful
//! execute:
//!
//! | variant | applies | captures for undo |
//! |---|---|---|
//! | `AssignTechnician` | technician + status `assigned`, one write | prior technician + status |
//! | `UpdateStatus` | validated status transition | prior status |
//! | `UpdatePriority` | priority field | prior priority |
//!
//! `execute` composes its port calls into one unit of work via
//! [`run_unit`]; the command marks itself executed only after the unit
//! commits. `undo` re-applies the captured pre-image as a raw field write —
//! a pre-image is not always a forward transition (undoing an assignment
//! puts an `assigned` ticket back to `pending`), so it deliberately bypasses
//! the successor table. `redo` is idempotent and otherwise delegates to
//! `execute`.

pub mod invoker;

use crate::audit::{AuditAction, AuditEvent, Effects};
use crate::error::LifecycleError;
use crate::model::ticket::{FieldPatch, Priority, TicketId, TicketRecord, fields};
use crate::port::{TicketStore, run_unit};
use crate::state::Status;
use serde::Serialize;

pub use invoker::{CommandInvoker, HISTORY_CAPACITY, HistoryEntry};

/// One reversible admin action on a ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TicketCommand {
    /// Assign a technician to a pending, unassigned ticket. The technician
    /// id and the move to `assigned` are applied as one logical write;
    /// legality comes from the precondition, not the successor table.
    AssignTechnician {
        ticket_id: TicketId,
        technician_id: String,
        actor_id: String,
        note: Option<String>,
        #[serde(default)]
        executed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        prior: Option<FieldPatch>,
    },
    /// Move a ticket to a successor status, with an audit note.
    UpdateStatus {
        ticket_id: TicketId,
        new_status: Status,
        actor_id: String,
        note: Option<String>,
        #[serde(default)]
        executed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        prior: Option<FieldPatch>,
    },
    /// Change the operator-set priority.
    UpdatePriority {
        ticket_id: TicketId,
        new_priority: Priority,
        actor_id: String,
        note: Option<String>,
        #[serde(default)]
        executed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        prior: Option<FieldPatch>,
    },
}

fn patch(entries: Vec<(&str, serde_json::Value)>) -> FieldPatch {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn record_patch(record: &TicketRecord, keys: &FieldPatch) -> FieldPatch {
    keys.keys()
        .filter_map(|k| record.field_value(k).map(|v| (k.clone(), v)))
        .collect()
}

impl TicketCommand {
    /// Fresh assignment intent.
    #[must_use]
    pub fn assign_technician(
        ticket_id: TicketId,
        technician_id: impl Into<String>,
        actor_id: impl Into<String>,
        note: Option<String>,
    ) -> Self {
        Self::AssignTechnician {
            ticket_id,
            technician_id: technician_id.into(),
            actor_id: actor_id.into(),
            note,
            executed: false,
            prior: None,
        }
    }

    /// Fresh status-change intent.
    #[must_use]
    pub fn update_status(
        ticket_id: TicketId,
        new_status: Status,
        actor_id: impl Into<String>,
        note: Option<String>,
    ) -> Self {
        Self::UpdateStatus {
            ticket_id,
            new_status,
            actor_id: actor_id.into(),
            note,
            executed: false,
            prior: None,
        }
    }

    /// Fresh priority-change intent.
    #[must_use]
    pub fn update_priority(
        ticket_id: TicketId,
        new_priority: Priority,
        actor_id: impl Into<String>,
        note: Option<String>,
    ) -> Self {
        Self::UpdatePriority {
            ticket_id,
            new_priority,
            actor_id: actor_id.into(),
            note,
            executed: false,
            prior: None,
        }
    }

    #[must_use]
    pub const fn ticket_id(&self) -> &TicketId {
        match self {
            Self::AssignTechnician { ticket_id, .. }
            | Self::UpdateStatus { ticket_id, .. }
            | Self::UpdatePriority { ticket_id, .. } => ticket_id,
        }
    }

    #[must_use]
    pub fn actor_id(&self) -> &str {
        match self {
            Self::AssignTechnician { actor_id, .. }
            | Self::UpdateStatus { actor_id, .. }
            | Self::UpdatePriority { actor_id, .. } => actor_id,
        }
    }

    /// Whether a successful execute (or redo) is currently in effect.
    #[must_use]
    pub const fn is_executed(&self) -> bool {
        match self {
            Self::AssignTechnician { executed, .. }
            | Self::UpdateStatus { executed, .. }
            | Self::UpdatePriority { executed, .. } => *executed,
        }
    }

    /// The captured pre-image, present only after a successful execute.
    #[must_use]
    pub const fn prior(&self) -> Option<&FieldPatch> {
        match self {
            Self::AssignTechnician { prior, .. }
            | Self::UpdateStatus { prior, .. }
            | Self::UpdatePriority { prior, .. } => prior.as_ref(),
        }
    }

    fn set_outcome(&mut self, new_executed: bool, new_prior: Option<FieldPatch>) {
        match self {
            Self::AssignTechnician { executed, prior, .. }
            | Self::UpdateStatus { executed, prior, .. }
            | Self::UpdatePriority { executed, prior, .. } => {
                *executed = new_executed;
                if let Some(p) = new_prior {
                    *prior = Some(p);
                }
            }
        }
    }

    /// Human-readable one-line summary of the intent.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::AssignTechnician {
                ticket_id,
                technician_id,
                actor_id,
                ..
            } => format!("assign technician {technician_id} to {ticket_id} (by {actor_id})"),
            Self::UpdateStatus {
                ticket_id,
                new_status,
                actor_id,
                ..
            } => format!("set status of {ticket_id} to {new_status} (by {actor_id})"),
            Self::UpdatePriority {
                ticket_id,
                new_priority,
                actor_id,
                ..
            } => format!("set priority of {ticket_id} to {new_priority} (by {actor_id})"),
        }
    }

    /// Structured representation for history listings and transports,
    /// including the undo-capture state.
    #[must_use]
    pub fn serialize(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Run the command against the store, capturing the pre-image for undo.
    ///
    /// All port calls happen inside one unit of work; the command marks
    /// itself executed only after the unit commits.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotFound`] when the ticket does not exist,
    /// [`LifecycleError::IllegalTransition`] when a status target is not a
    /// successor, [`LifecycleError::PreconditionFailed`] when a
    /// variant-specific guard fails, [`LifecycleError::Store`] on
    /// persistence failure (rolled back).
    pub fn execute(
        &mut self,
        store: &mut dyn TicketStore,
        fx: &Effects<'_>,
    ) -> Result<(), LifecycleError> {
        self.apply(store, fx, AuditAction::Execute)
    }

    /// Reverse a previously executed command by re-applying its captured
    /// pre-image. Returns `Ok(false)` without touching anything when the
    /// command is not currently executed. On a write failure the command
    /// stays executed, so the caller may safely retry.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotFound`] when the ticket has since disappeared;
    /// [`LifecycleError::Store`] on persistence failure.
    pub fn undo(
        &mut self,
        store: &mut dyn TicketStore,
        fx: &Effects<'_>,
    ) -> Result<bool, LifecycleError> {
        if !self.is_executed() {
            return Ok(false);
        }
        let Some(pre_image) = self.prior().cloned() else {
            return Ok(false);
        };
        let ticket_id = self.ticket_id().clone();
        let actor_id = self.actor_id().to_string();

        let (before, after_record) = run_unit(store, |s| {
            let record = s
                .find(&ticket_id)?
                .ok_or_else(|| LifecycleError::NotFound(ticket_id.clone()))?;
            let before = record_patch(&record, &pre_image);
            if !s.update_fields(&ticket_id, &pre_image)? {
                return Err(LifecycleError::NotFound(ticket_id.clone()));
            }
            let after_record = s
                .find(&ticket_id)?
                .ok_or_else(|| LifecycleError::NotFound(ticket_id.clone()))?;
            Ok((before, after_record))
        })?;

        self.set_outcome(false, None);
        let after = record_patch(&after_record, &pre_image);
        let status_changed = before.get(fields::STATUS) != after.get(fields::STATUS);
        fx.audit.record(&AuditEvent::new(
            AuditAction::Undo,
            ticket_id,
            actor_id,
            before,
            after,
        ));
        if status_changed {
            fx.entry.on_enter(&after_record);
        }
        Ok(true)
    }

    /// Re-apply an undone command. Idempotent: returns `Ok(true)`
    /// immediately when already executed, otherwise delegates to the
    /// execute path (re-reading the record and re-checking guards).
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::execute`].
    pub fn redo(
        &mut self,
        store: &mut dyn TicketStore,
        fx: &Effects<'_>,
    ) -> Result<bool, LifecycleError> {
        if self.is_executed() {
            return Ok(true);
        }
        self.apply(store, fx, AuditAction::Redo)?;
        Ok(true)
    }

    fn apply(
        &mut self,
        store: &mut dyn TicketStore,
        fx: &Effects<'_>,
        action: AuditAction,
    ) -> Result<(), LifecycleError> {
        if self.is_executed() {
            return Err(LifecycleError::NothingToDo("command already executed"));
        }
        match self.clone() {
            Self::AssignTechnician {
                ticket_id,
                technician_id,
                actor_id,
                ..
            } => {
                let (before, after_record) = run_unit(store, |s| {
                    let record = s
                        .find(&ticket_id)?
                        .ok_or_else(|| LifecycleError::NotFound(ticket_id.clone()))?;
                    if record.status != Status::Pending {
                        return Err(LifecycleError::PreconditionFailed {
                            reason: format!(
                                "assignment requires a pending ticket; {ticket_id} is {}",
                                record.status
                            ),
                        });
                    }
                    if let Some(current) = &record.assigned_technician_id {
                        return Err(LifecycleError::PreconditionFailed {
                            reason: format!("{ticket_id} is already assigned to {current}"),
                        });
                    }
                    let apply = patch(vec![
                        (
                            fields::ASSIGNED_TECHNICIAN_ID,
                            serde_json::Value::String(technician_id.clone()),
                        ),
                        (
                            fields::STATUS,
                            serde_json::to_value(Status::Assigned).map_err(crate::port::StoreError::from)?,
                        ),
                    ]);
                    let before = record_patch(&record, &apply);
                    if !s.update_fields(&ticket_id, &apply)? {
                        return Err(LifecycleError::NotFound(ticket_id.clone()));
                    }
                    let after_record = s
                        .find(&ticket_id)?
                        .ok_or_else(|| LifecycleError::NotFound(ticket_id.clone()))?;
                    Ok((before, after_record))
                })?;
                self.finish(fx, action, actor_id, before, &after_record, true);
            }
            Self::UpdateStatus {
                ticket_id,
                new_status,
                actor_id,
                note,
                ..
            } => {
                let (before, after_record) = run_unit(store, |s| {
                    let record = s
                        .find(&ticket_id)?
                        .ok_or_else(|| LifecycleError::NotFound(ticket_id.clone()))?;
                    let from = record.status;
                    if !from.can_transition_to(new_status) {
                        return Err(LifecycleError::IllegalTransition {
                            from,
                            to: new_status,
                        });
                    }
                    let audit_note = note
                        .clone()
                        .unwrap_or_else(|| format!("status changed from {from} to {new_status}"));
                    if !s.transition_status(&ticket_id, new_status, &actor_id, Some(&audit_note))? {
                        return Err(LifecycleError::PreconditionFailed {
                            reason: format!("store rejected transition {from} -> {new_status}"),
                        });
                    }
                    let before = patch(vec![(
                        fields::STATUS,
                        serde_json::to_value(from).map_err(crate::port::StoreError::from)?,
                    )]);
                    let after_record = s
                        .find(&ticket_id)?
                        .ok_or_else(|| LifecycleError::NotFound(ticket_id.clone()))?;
                    Ok((before, after_record))
                })?;
                self.finish(fx, action, actor_id, before, &after_record, true);
            }
            Self::UpdatePriority {
                ticket_id,
                new_priority,
                actor_id,
                ..
            } => {
                let (before, after_record) = run_unit(store, |s| {
                    let record = s
                        .find(&ticket_id)?
                        .ok_or_else(|| LifecycleError::NotFound(ticket_id.clone()))?;
                    if record.priority == new_priority {
                        return Err(LifecycleError::PreconditionFailed {
                            reason: format!("{ticket_id} already has priority {new_priority}"),
                        });
                    }
                    let apply = patch(vec![(
                        fields::PRIORITY,
                        serde_json::to_value(new_priority).map_err(crate::port::StoreError::from)?,
                    )]);
                    let before = record_patch(&record, &apply);
                    if !s.update_fields(&ticket_id, &apply)? {
                        return Err(LifecycleError::NotFound(ticket_id.clone()));
                    }
                    let after_record = s
                        .find(&ticket_id)?
                        .ok_or_else(|| LifecycleError::NotFound(ticket_id.clone()))?;
                    Ok((before, after_record))
                })?;
                self.finish(fx, action, actor_id, before, &after_record, false);
            }
        }
        Ok(())
    }

    /// Post-commit bookkeeping shared by every variant: capture the
    /// pre-image, flip `executed`, emit audit, fire the entry hook when the
    /// status changed.
    fn finish(
        &mut self,
        fx: &Effects<'_>,
        action: AuditAction,
        actor_id: String,
        before: FieldPatch,
        after_record: &TicketRecord,
        touches_status: bool,
    ) {
        let after = record_patch(after_record, &before);
        self.set_outcome(true, Some(before.clone()));
        fx.audit.record(&AuditEvent::new(
            action,
            after_record.id.clone(),
            actor_id,
            before,
            after,
        ));
        if touches_status {
            fx.entry.on_enter(after_record);
        }
    }
}
