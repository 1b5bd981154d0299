//! In-memory ticket store.
//!
//! A `BTreeMap` of records plus a transition-note log. The ambient
//! transaction is a full backup taken at `begin_work` and put back on
//! rollback — crude, but exactly the all-or-nothing semantics the port
//! promises, and cheap at in-memory scale.

use crate::model::ticket::{FieldPatch, Priority, TicketId, TicketRecord, fields};
use crate::port::{StoreError, TicketStore};
use crate::state::Status;
use crate::store::StoredNote;
use chrono::Utc;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tickets: BTreeMap<TicketId, TicketRecord>,
    notes: Vec<StoredNote>,
    backup: Option<(BTreeMap<TicketId, TicketRecord>, usize)>,
    seq: u64,
}

fn string_field(name: &str, value: &serde_json::Value) -> Result<String, StoreError> {
    value.as_str().map(String::from).ok_or_else(|| StoreError::Corrupt {
        field: name.to_string(),
        detail: format!("expected a string, got {value}"),
    })
}

fn apply_patch(record: &mut TicketRecord, patch: &FieldPatch) -> Result<(), StoreError> {
    for (name, value) in patch {
        match name.as_str() {
            fields::STATUS => {
                record.status = serde_json::from_value::<Status>(value.clone())?;
            }
            fields::PRIORITY => {
                record.priority = serde_json::from_value::<Priority>(value.clone())?;
            }
            fields::ASSIGNED_TECHNICIAN_ID => {
                record.assigned_technician_id = match value {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s.clone()),
                    other => {
                        return Err(StoreError::Corrupt {
                            field: name.clone(),
                            detail: format!("expected a string or null, got {other}"),
                        });
                    }
                };
            }
            fields::TITLE => record.title = string_field(name, value)?,
            fields::DESCRIPTION => record.description = string_field(name, value)?,
            fields::LOCATION => record.location = string_field(name, value)?,
            _ => return Err(StoreError::UnknownField(name.clone())),
        }
    }
    record.updated_at = Utc::now();
    Ok(())
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record; `false` when the id is already taken.
    pub fn create_ticket(&mut self, record: TicketRecord) -> bool {
        if self.tickets.contains_key(&record.id) {
            return false;
        }
        self.tickets.insert(record.id.clone(), record);
        true
    }

    /// Create a fresh pending ticket with a generated id. Test/demo helper.
    pub fn seed_ticket(
        &mut self,
        title: &str,
        description: &str,
        location: &str,
        priority: Priority,
    ) -> TicketId {
        self.seq += 1;
        let id = TicketId::new(format!("tk-{:04}", self.seq)).expect("generated id is non-empty");
        let record = TicketRecord::new(id.clone(), title, description, location, priority, Utc::now());
        self.tickets.insert(id.clone(), record);
        id
    }

    #[must_use]
    pub fn list_tickets(&self) -> Vec<TicketRecord> {
        self.tickets.values().cloned().collect()
    }

    /// Transition notes recorded for one ticket, oldest-first.
    #[must_use]
    pub fn notes_for(&self, id: &TicketId) -> Vec<StoredNote> {
        self.notes
            .iter()
            .filter(|n| &n.ticket_id == id)
            .cloned()
            .collect()
    }
}

impl TicketStore for InMemoryStore {
    fn find(&mut self, id: &TicketId) -> Result<Option<TicketRecord>, StoreError> {
        Ok(self.tickets.get(id).cloned())
    }

    fn update_fields(&mut self, id: &TicketId, patch: &FieldPatch) -> Result<bool, StoreError> {
        let Some(record) = self.tickets.get_mut(id) else {
            return Ok(false);
        };
        apply_patch(record, patch)?;
        Ok(true)
    }

    fn transition_status(
        &mut self,
        id: &TicketId,
        new_status: Status,
        actor_id: &str,
        note: Option<&str>,
    ) -> Result<bool, StoreError> {
        let Some(record) = self.tickets.get_mut(id) else {
            return Ok(false);
        };
        if !record.status.can_transition_to(new_status) {
            return Ok(false);
        }
        record.status = new_status;
        record.updated_at = Utc::now();
        self.notes.push(StoredNote {
            ticket_id: id.clone(),
            status: new_status,
            actor_id: actor_id.to_string(),
            note: note.map(String::from),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    fn begin_work(&mut self) -> Result<(), StoreError> {
        debug_assert!(self.backup.is_none(), "units of work do not nest");
        self.backup = Some((self.tickets.clone(), self.notes.len()));
        Ok(())
    }

    fn commit_work(&mut self) -> Result<(), StoreError> {
        self.backup = None;
        Ok(())
    }

    fn rollback_work(&mut self) -> Result<(), StoreError> {
        if let Some((tickets, notes_len)) = self.backup.take() {
            self.tickets = tickets;
            self.notes.truncate(notes_len);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryStore;
    use crate::model::ticket::{FieldPatch, Priority, TicketId, fields};
    use crate::port::{StoreError, TicketStore};
    use crate::state::Status;

    fn seeded() -> (InMemoryStore, TicketId) {
        let mut store = InMemoryStore::new();
        let id = store.seed_ticket("Noise complaint", "Ongoing at night", "4 Low Rd", Priority::Low);
        (store, id)
    }

    #[test]
    fn find_returns_none_for_unknown_id() {
        let mut store = InMemoryStore::new();
        let id = TicketId::new("tk-missing").unwrap();
        assert!(store.find(&id).unwrap().is_none());
    }

    #[test]
    fn update_fields_on_missing_ticket_is_false() {
        let mut store = InMemoryStore::new();
        let id = TicketId::new("tk-missing").unwrap();
        let patch = FieldPatch::new();
        assert!(!store.update_fields(&id, &patch).unwrap());
    }

    #[test]
    fn update_fields_applies_and_clears_values() {
        let (mut store, id) = seeded();
        let mut patch = FieldPatch::new();
        patch.insert(fields::TITLE.into(), "New title".into());
        patch.insert(fields::ASSIGNED_TECHNICIAN_ID.into(), "tech-1".into());
        assert!(store.update_fields(&id, &patch).unwrap());

        let record = store.find(&id).unwrap().unwrap();
        assert_eq!(record.title, "New title");
        assert_eq!(record.assigned_technician_id.as_deref(), Some("tech-1"));

        let mut clear = FieldPatch::new();
        clear.insert(fields::ASSIGNED_TECHNICIAN_ID.into(), serde_json::Value::Null);
        assert!(store.update_fields(&id, &clear).unwrap());
        assert!(store.find(&id).unwrap().unwrap().assigned_technician_id.is_none());
    }

    #[test]
    fn update_fields_rejects_unknown_field() {
        let (mut store, id) = seeded();
        let mut patch = FieldPatch::new();
        patch.insert("severity".into(), "high".into());
        assert!(matches!(
            store.update_fields(&id, &patch),
            Err(StoreError::UnknownField(_))
        ));
    }

    #[test]
    fn transition_rejects_non_successor_without_error() {
        let (mut store, id) = seeded();
        assert!(!store
            .transition_status(&id, Status::Completed, "admin-1", None)
            .unwrap());
        assert_eq!(store.find(&id).unwrap().unwrap().status, Status::Pending);
        assert!(store.notes_for(&id).is_empty());
    }

    #[test]
    fn transition_appends_a_note() {
        let (mut store, id) = seeded();
        assert!(store
            .transition_status(&id, Status::Reviewed, "admin-1", Some("looks real"))
            .unwrap());
        let notes = store.notes_for(&id);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].status, Status::Reviewed);
        assert_eq!(notes[0].actor_id, "admin-1");
        assert_eq!(notes[0].note.as_deref(), Some("looks real"));
    }

    #[test]
    fn rollback_restores_records_and_notes() {
        let (mut store, id) = seeded();
        store.begin_work().unwrap();
        store
            .transition_status(&id, Status::Reviewed, "admin-1", None)
            .unwrap();
        store.rollback_work().unwrap();

        assert_eq!(store.find(&id).unwrap().unwrap().status, Status::Pending);
        assert!(store.notes_for(&id).is_empty());
    }

    #[test]
    fn create_ticket_refuses_duplicate_ids() {
        let (mut store, id) = seeded();
        let dup = store.find(&id).unwrap().unwrap();
        assert!(!store.create_ticket(dup));
    }
}
