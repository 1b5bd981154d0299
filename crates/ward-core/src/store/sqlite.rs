//! SQLite ticket store.
//!
//! Runtime defaults are intentionally conservative:
//! - `journal_mode = WAL` to allow concurrent readers while a writer works
//! - `busy_timeout = 5s` to reduce transient lock failures under contention
//! - `foreign_keys = ON` to protect the history table's referential integrity
//!
//! Schema versioning rides on `PRAGMA user_version`; timestamps are stored
//! as RFC 3339 text.

use crate::model::ticket::{FieldPatch, Priority, TicketId, TicketRecord, fields};
use crate::port::{StoreError, TicketStore};
use crate::state::Status;
use crate::store::StoredNote;
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Busy timeout for ticket DB connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Migration v1: the ticket record plus its transition history.
const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS tickets (
    ticket_id TEXT PRIMARY KEY,
    status TEXT NOT NULL CHECK (status IN
        ('pending', 'reviewed', 'assigned', 'in_progress', 'completed', 'cancelled')),
    priority TEXT NOT NULL DEFAULT 'normal' CHECK (priority IN
        ('low', 'normal', 'high', 'urgent')),
    assigned_technician_id TEXT,
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    description TEXT NOT NULL DEFAULT '',
    location TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ticket_history (
    entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id TEXT NOT NULL REFERENCES tickets(ticket_id) ON DELETE CASCADE,
    status TEXT NOT NULL,
    actor_id TEXT NOT NULL,
    note TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ticket_history_ticket
    ON ticket_history (ticket_id, entry_id);
";

const RECORD_COLUMNS: &str = "ticket_id, status, priority, assigned_technician_id, \
     title, description, location, created_at, updated_at";

/// Ticket store backed by a SQLite database.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

fn parse_time(field: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            field: field.to_string(),
            detail: e.to_string(),
        })
}

fn corrupt(field: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt {
        field: field.to_string(),
        detail: err.to_string(),
    }
}

type RawRecord = (
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    String,
    String,
);

fn record_from_raw(raw: RawRecord) -> Result<TicketRecord, StoreError> {
    let (id, status, priority, technician, title, description, location, created, updated) = raw;
    Ok(TicketRecord {
        id: TicketId::new(id).map_err(|e| corrupt("ticket_id", e))?,
        status: Status::from_str(&status).map_err(|e| corrupt("status", e))?,
        priority: Priority::from_str(&priority).map_err(|e| corrupt("priority", e))?,
        assigned_technician_id: technician,
        title,
        description,
        location,
        created_at: parse_time("created_at", &created)?,
        updated_at: parse_time("updated_at", &updated)?,
    })
}

impl SqliteStore {
    /// Open (or create) the ticket database at `path`, apply pragmas, and
    /// migrate the schema to the latest version.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created or SQLite refuses the
    /// open/configure/migrate sequence.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Fresh in-memory database, mainly for tests.
    ///
    /// # Errors
    ///
    /// Propagates SQLite failures.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        let _journal_mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        Self::migrate(&conn)?;
        Ok(Self { conn })
    }

    fn migrate(conn: &Connection) -> Result<(), StoreError> {
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version < 1 {
            conn.execute_batch(MIGRATION_V1_SQL)?;
            conn.pragma_update(None, "user_version", 1)?;
        }
        Ok(())
    }

    /// Insert a new ticket record.
    ///
    /// # Errors
    ///
    /// Duplicate ids surface as the underlying constraint violation.
    pub fn create_ticket(&mut self, record: &TicketRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO tickets (ticket_id, status, priority, assigned_technician_id, \
             title, description, location, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id.as_str(),
                record.status.as_str(),
                record.priority.as_str(),
                record.assigned_technician_id,
                record.title,
                record.description,
                record.location,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All tickets, oldest-created first.
    ///
    /// # Errors
    ///
    /// Propagates SQLite failures and corrupt-row decoding.
    pub fn list_tickets(&mut self) -> Result<Vec<TicketRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM tickets ORDER BY created_at, ticket_id"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
            ))
        })?;
        let mut records = Vec::new();
        for raw in rows {
            records.push(record_from_raw(raw?)?);
        }
        Ok(records)
    }

    /// Transition notes for one ticket, oldest-first.
    ///
    /// # Errors
    ///
    /// Propagates SQLite failures and corrupt-row decoding.
    pub fn notes_for(&mut self, id: &TicketId) -> Result<Vec<StoredNote>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT status, actor_id, note, created_at FROM ticket_history \
             WHERE ticket_id = ?1 ORDER BY entry_id",
        )?;
        let rows = stmt.query_map([id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut notes = Vec::new();
        for raw in rows {
            let (status, actor_id, note, created_at) = raw?;
            notes.push(StoredNote {
                ticket_id: id.clone(),
                status: Status::from_str(&status).map_err(|e| corrupt("status", e))?,
                actor_id,
                note,
                created_at: parse_time("created_at", &created_at)?,
            });
        }
        Ok(notes)
    }

    fn patch_value(name: &str, value: &serde_json::Value) -> Result<SqlValue, StoreError> {
        match name {
            fields::STATUS => {
                let status: Status = serde_json::from_value(value.clone())?;
                Ok(SqlValue::Text(status.as_str().to_string()))
            }
            fields::PRIORITY => {
                let priority: Priority = serde_json::from_value(value.clone())?;
                Ok(SqlValue::Text(priority.as_str().to_string()))
            }
            fields::ASSIGNED_TECHNICIAN_ID => match value {
                serde_json::Value::Null => Ok(SqlValue::Null),
                serde_json::Value::String(s) => Ok(SqlValue::Text(s.clone())),
                other => Err(corrupt(name, format!("expected a string or null, got {other}"))),
            },
            fields::TITLE | fields::DESCRIPTION | fields::LOCATION => value
                .as_str()
                .map(|s| SqlValue::Text(s.to_string()))
                .ok_or_else(|| corrupt(name, format!("expected a string, got {value}"))),
            _ => Err(StoreError::UnknownField(name.to_string())),
        }
    }
}

impl TicketStore for SqliteStore {
    fn find(&mut self, id: &TicketId) -> Result<Option<TicketRecord>, StoreError> {
        let raw: Option<RawRecord> = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM tickets WHERE ticket_id = ?1"),
                [id.as_str()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                    ))
                },
            )
            .optional()?;
        raw.map(record_from_raw).transpose()
    }

    fn update_fields(&mut self, id: &TicketId, patch: &FieldPatch) -> Result<bool, StoreError> {
        let mut sets = Vec::with_capacity(patch.len() + 1);
        let mut args: Vec<SqlValue> = Vec::with_capacity(patch.len() + 2);
        for (name, value) in patch {
            args.push(Self::patch_value(name, value)?);
            sets.push(format!("{name} = ?{}", args.len()));
        }
        args.push(SqlValue::Text(Utc::now().to_rfc3339()));
        sets.push(format!("updated_at = ?{}", args.len()));
        args.push(SqlValue::Text(id.as_str().to_string()));

        let sql = format!(
            "UPDATE tickets SET {} WHERE ticket_id = ?{}",
            sets.join(", "),
            args.len()
        );
        let rows = self.conn.execute(&sql, params_from_iter(args))?;
        Ok(rows > 0)
    }

    fn transition_status(
        &mut self,
        id: &TicketId,
        new_status: Status,
        actor_id: &str,
        note: Option<&str>,
    ) -> Result<bool, StoreError> {
        let current: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM tickets WHERE ticket_id = ?1",
                [id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(raw) = current else {
            return Ok(false);
        };
        let current = Status::from_str(&raw).map_err(|e| corrupt("status", e))?;
        if !current.can_transition_to(new_status) {
            return Ok(false);
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE tickets SET status = ?1, updated_at = ?2 WHERE ticket_id = ?3",
            params![new_status.as_str(), now, id.as_str()],
        )?;
        self.conn.execute(
            "INSERT INTO ticket_history (ticket_id, status, actor_id, note, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id.as_str(), new_status.as_str(), actor_id, note, now],
        )?;
        Ok(true)
    }

    fn begin_work(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit_work(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback_work(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteStore;
    use crate::model::ticket::{FieldPatch, Priority, TicketId, TicketRecord, fields};
    use crate::port::TicketStore;
    use crate::state::Status;
    use chrono::Utc;
    use tempfile::TempDir;

    fn seeded() -> (SqliteStore, TicketId) {
        let mut store = SqliteStore::open_in_memory().expect("open in-memory db");
        let id = TicketId::new("tk-1001").unwrap();
        let record = TicketRecord::new(
            id.clone(),
            "Blocked storm drain",
            "Standing water after rain",
            "Cedar Ave & 9th",
            Priority::Normal,
            Utc::now(),
        );
        store.create_ticket(&record).unwrap();
        (store, id)
    }

    #[test]
    fn open_creates_schema_on_disk() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("nested/ward-tickets.sqlite3");
        let mut store = SqliteStore::open(&path).expect("open ticket db");
        assert!(path.exists());
        assert!(store.list_tickets().unwrap().is_empty());
    }

    #[test]
    fn create_find_roundtrip() {
        let (mut store, id) = seeded();
        let record = store.find(&id).unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.status, Status::Pending);
        assert_eq!(record.title, "Blocked storm drain");
        assert!(record.assigned_technician_id.is_none());
    }

    #[test]
    fn duplicate_create_fails() {
        let (mut store, id) = seeded();
        let record = store.find(&id).unwrap().unwrap();
        assert!(store.create_ticket(&record).is_err());
    }

    #[test]
    fn update_fields_sets_and_clears_columns() {
        let (mut store, id) = seeded();
        let mut patch = FieldPatch::new();
        patch.insert(fields::ASSIGNED_TECHNICIAN_ID.into(), "tech-2".into());
        patch.insert(fields::PRIORITY.into(), "urgent".into());
        assert!(store.update_fields(&id, &patch).unwrap());

        let record = store.find(&id).unwrap().unwrap();
        assert_eq!(record.assigned_technician_id.as_deref(), Some("tech-2"));
        assert_eq!(record.priority, Priority::Urgent);

        let mut clear = FieldPatch::new();
        clear.insert(fields::ASSIGNED_TECHNICIAN_ID.into(), serde_json::Value::Null);
        assert!(store.update_fields(&id, &clear).unwrap());
        assert!(store.find(&id).unwrap().unwrap().assigned_technician_id.is_none());
    }

    #[test]
    fn transition_validates_and_records_history() {
        let (mut store, id) = seeded();
        assert!(!store
            .transition_status(&id, Status::Completed, "admin-1", None)
            .unwrap());
        assert!(store
            .transition_status(&id, Status::Reviewed, "admin-1", Some("triaged"))
            .unwrap());

        let record = store.find(&id).unwrap().unwrap();
        assert_eq!(record.status, Status::Reviewed);

        let notes = store.notes_for(&id).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].status, Status::Reviewed);
        assert_eq!(notes[0].note.as_deref(), Some("triaged"));
    }

    #[test]
    fn rollback_discards_uncommitted_writes() {
        let (mut store, id) = seeded();
        store.begin_work().unwrap();
        store
            .transition_status(&id, Status::Reviewed, "admin-1", None)
            .unwrap();
        store.rollback_work().unwrap();

        assert_eq!(store.find(&id).unwrap().unwrap().status, Status::Pending);
        assert!(store.notes_for(&id).unwrap().is_empty());
    }

    #[test]
    fn missing_ticket_writes_return_false() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let ghost = TicketId::new("tk-ghost").unwrap();
        assert!(!store.update_fields(&ghost, &FieldPatch::new()).unwrap());
        assert!(!store
            .transition_status(&ghost, Status::Reviewed, "admin-1", None)
            .unwrap());
    }
}
