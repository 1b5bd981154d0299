//! Point-in-time ticket snapshots: memento, originator, caretaker.
//!
//! A [`TicketMemento`] is an immutable copy of a ticket's mutable fields,
//! taken from a fresh read and never modified afterwards. The
//! [`SnapshotOriginator`] is bound to one ticket id and knows how to capture
//! and restore; the [`SnapshotStore`] caretaker owns mementos by key without
//! interpreting their contents beyond what its listing needs.
//!
//! Restore writes the captured status through the validated transition path,
//! so the successor table and entry hooks still apply; all other fields go
//! back as one raw field write. Fields absent from an (older) memento fall
//! back to the record's last-known values.

use crate::audit::{AuditAction, AuditEvent, Effects};
use crate::error::LifecycleError;
use crate::model::ticket::{FieldPatch, TicketId, TicketRecord, fields};
use crate::port::{TicketStore, run_unit};
use crate::state::Status;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Maximum number of snapshots the caretaker retains.
pub const SNAPSHOT_CAPACITY: usize = 10;

/// Immutable captured state of one ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketMemento {
    ticket_id: TicketId,
    captured: FieldPatch,
    taken_at: DateTime<Utc>,
    label: String,
}

impl TicketMemento {
    fn from_record(record: &TicketRecord, label: String) -> Self {
        let captured = fields::ALL
            .iter()
            .filter_map(|name| record.field_value(name).map(|v| ((*name).to_string(), v)))
            .collect();
        Self {
            ticket_id: record.id.clone(),
            captured,
            taken_at: Utc::now(),
            label,
        }
    }

    #[must_use]
    pub const fn ticket_id(&self) -> &TicketId {
        &self.ticket_id
    }

    #[must_use]
    pub const fn captured_fields(&self) -> &FieldPatch {
        &self.captured
    }

    #[must_use]
    pub const fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The captured lifecycle status, if the memento recorded one.
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        self.captured
            .get(fields::STATUS)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// The captured technician, `None` when captured as unassigned or when
    /// the field is absent.
    #[must_use]
    pub fn assignee(&self) -> Option<&str> {
        self.captured
            .get(fields::ASSIGNED_TECHNICIAN_ID)
            .and_then(serde_json::Value::as_str)
    }
}

/// Captures and restores snapshots for one ticket.
#[derive(Debug, Clone)]
pub struct SnapshotOriginator {
    ticket_id: TicketId,
}

impl SnapshotOriginator {
    #[must_use]
    pub const fn new(ticket_id: TicketId) -> Self {
        Self { ticket_id }
    }

    #[must_use]
    pub const fn ticket_id(&self) -> &TicketId {
        &self.ticket_id
    }

    /// Capture the ticket's current mutable fields. Always re-reads the
    /// record — a stale copy must never become a memento.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotFound`] when the ticket does not exist;
    /// [`LifecycleError::Store`] on persistence failure.
    pub fn capture(
        &self,
        store: &mut dyn TicketStore,
        label: impl Into<String>,
    ) -> Result<TicketMemento, LifecycleError> {
        let record = store
            .find(&self.ticket_id)?
            .ok_or_else(|| LifecycleError::NotFound(self.ticket_id.clone()))?;
        Ok(TicketMemento::from_record(&record, label.into()))
    }

    /// Write the memento's captured fields back to the record as one unit of
    /// work. The status goes through the validated transition path (no-op
    /// when unchanged); every other field is restored raw, falling back to
    /// the record's current value when absent from the memento.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotFound`] when the ticket is gone,
    /// [`LifecycleError::IllegalTransition`] when the captured status is not
    /// a legal successor of the current one, [`LifecycleError::Store`] on
    /// persistence failure (rolled back).
    pub fn restore(
        &self,
        store: &mut dyn TicketStore,
        fx: &Effects<'_>,
        memento: &TicketMemento,
        actor_id: &str,
    ) -> Result<(), LifecycleError> {
        let ticket_id = self.ticket_id.clone();
        let target_status = memento.status();
        let label = memento.label().to_string();
        let captured = memento.captured_fields().clone();

        let (before, after_record) = run_unit(store, |s| {
            let record = s
                .find(&ticket_id)?
                .ok_or_else(|| LifecycleError::NotFound(ticket_id.clone()))?;

            let before: FieldPatch = fields::ALL
                .iter()
                .filter_map(|name| record.field_value(name).map(|v| ((*name).to_string(), v)))
                .collect();

            // Merge: captured value wins, last-known value fills the gaps.
            let patch: FieldPatch = fields::ALL
                .iter()
                .filter(|name| **name != fields::STATUS)
                .filter_map(|name| {
                    captured
                        .get(*name)
                        .cloned()
                        .or_else(|| record.field_value(name))
                        .map(|v| ((*name).to_string(), v))
                })
                .collect();

            if let Some(target) = target_status {
                if target != record.status {
                    if !record.status.can_transition_to(target) {
                        return Err(LifecycleError::IllegalTransition {
                            from: record.status,
                            to: target,
                        });
                    }
                    let note = format!("restore snapshot '{label}'");
                    if !s.transition_status(&ticket_id, target, actor_id, Some(&note))? {
                        return Err(LifecycleError::PreconditionFailed {
                            reason: format!(
                                "store rejected transition {} -> {target}",
                                record.status
                            ),
                        });
                    }
                }
            }

            if !s.update_fields(&ticket_id, &patch)? {
                return Err(LifecycleError::NotFound(ticket_id.clone()));
            }
            let after_record = s
                .find(&ticket_id)?
                .ok_or_else(|| LifecycleError::NotFound(ticket_id.clone()))?;
            Ok((before, after_record))
        })?;

        let after: FieldPatch = fields::ALL
            .iter()
            .filter_map(|name| after_record.field_value(name).map(|v| ((*name).to_string(), v)))
            .collect();
        let status_changed = before.get(fields::STATUS) != after.get(fields::STATUS);
        fx.audit.record(&AuditEvent::new(
            AuditAction::Restore,
            ticket_id,
            actor_id,
            before,
            after,
        ));
        if status_changed {
            fx.entry.on_enter(&after_record);
        }
        Ok(())
    }
}

/// Listing row exposed by the caretaker: identity and labels only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub key: String,
    pub ticket_id: TicketId,
    pub label: String,
    pub taken_at: DateTime<Utc>,
    pub status: Option<Status>,
    pub assigned_technician_id: Option<String>,
}

/// Bounded key→memento store, insertion-ordered.
///
/// At capacity the oldest-inserted surviving entry is evicted — insertion
/// order, not access order. Re-saving an existing key replaces the memento
/// in place, keeping its original slot in the eviction order.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    entries: VecDeque<(String, TicketMemento)>,
}

impl SnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the memento stored under `key`.
    pub fn save(&mut self, key: impl Into<String>, memento: TicketMemento) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = memento;
            return;
        }
        if self.entries.len() == SNAPSHOT_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back((key, memento));
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TicketMemento> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, m)| m)
    }

    /// The most-recently-inserted entry.
    #[must_use]
    pub fn latest(&self) -> Option<(&str, &TicketMemento)> {
        self.entries.back().map(|(k, m)| (k.as_str(), m))
    }

    /// Summaries oldest-first: key, label, timestamp, status, assignee.
    #[must_use]
    pub fn list(&self) -> Vec<SnapshotSummary> {
        self.entries
            .iter()
            .map(|(key, memento)| SnapshotSummary {
                key: key.clone(),
                ticket_id: memento.ticket_id().clone(),
                label: memento.label().to_string(),
                taken_at: memento.taken_at(),
                status: memento.status(),
                assigned_technician_id: memento.assignee().map(String::from),
            })
            .collect()
    }

    /// Remove the entry under `key`; `false` when absent.
    pub fn remove(&mut self, key: &str) -> bool {
        let len_before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        self.entries.len() < len_before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
