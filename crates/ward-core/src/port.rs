//! The persistence port: the narrow contract every lifecycle layer uses to
//! read and mutate ticket records.
//!
//! Three data operations (`find`, `update_fields`, `transition_status`) plus
//! the ambient-transaction hooks (`begin_work`/`commit_work`/`rollback_work`).
//! A logical admin operation may touch several fields across several port
//! calls; [`run_unit`] composes those calls into one unit of work so a
//! failure rolls the whole operation back before any layer records success.
//!
//! The port is `&mut self` throughout: a store handle is owned by exactly one
//! logical caller context (one admin session), never shared across operators.

use crate::model::ticket::{FieldPatch, TicketId, TicketRecord};
use crate::state::Status;
use thiserror::Error;

/// Failure inside a store adapter. Everything here lands in the
/// "persistence failure" error category: unexpected, rolled back, reported
/// upstream as a generic processing failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("field encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("unknown field '{0}' in patch")]
    UnknownField(String),

    #[error("corrupt stored value for '{field}': {detail}")]
    Corrupt { field: String, detail: String },
}

/// The record store behind the lifecycle subsystem.
///
/// Write operations return `Ok(false)` to signal "no durable change" for
/// expected reasons (missing ticket, non-successor status); adapter-level
/// failures surface as [`StoreError`].
pub trait TicketStore {
    /// Fetch the current record, or `None` when the id is unknown.
    fn find(&mut self, id: &TicketId) -> Result<Option<TicketRecord>, StoreError>;

    /// Apply `patch` as one logical write. Raw: no lifecycle validation, so
    /// callers restoring a captured pre-image can put any field back,
    /// including `status`. `Null` clears an optional field.
    fn update_fields(&mut self, id: &TicketId, patch: &FieldPatch) -> Result<bool, StoreError>;

    /// Move the ticket to `new_status`, validating against the current
    /// status's successor set and appending an audit entry to the ticket's
    /// stored history. `Ok(false)` when the ticket is missing or the target
    /// is not a legal successor.
    fn transition_status(
        &mut self,
        id: &TicketId,
        new_status: Status,
        actor_id: &str,
        note: Option<&str>,
    ) -> Result<bool, StoreError>;

    /// Open the ambient transaction for one logical operation.
    fn begin_work(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Commit the ambient transaction.
    fn commit_work(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Abandon the ambient transaction, discarding uncommitted writes.
    fn rollback_work(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Run `op` as one unit of work: begin, run, commit on success, roll back on
/// any failure. The rollback error, if any, is dropped — the original
/// failure is the one worth reporting.
///
/// # Errors
///
/// Propagates transaction-control failures as `E` via `From<StoreError>`,
/// and whatever `op` itself returns.
pub fn run_unit<T, E>(
    store: &mut dyn TicketStore,
    op: impl FnOnce(&mut dyn TicketStore) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<StoreError>,
{
    store.begin_work().map_err(E::from)?;
    match op(store) {
        Ok(value) => match store.commit_work() {
            Ok(()) => Ok(value),
            Err(err) => {
                let _ = store.rollback_work();
                Err(E::from(err))
            }
        },
        Err(err) => {
            let _ = store.rollback_work();
            Err(err)
        }
    }
}
