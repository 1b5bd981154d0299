//! Audit event surface.
//!
//! After every successful execute/undo/redo/restore the lifecycle layers
//! emit one [`AuditEvent`] describing the before/after field values.
//! Delivery and fan-out are the receiver's concern; the sink contract is
//! fire-and-forget and must never fail the operation that produced the
//! event.

use crate::model::ticket::{FieldPatch, TicketId};
use crate::state::{EntryHook, LogEntryHook, NullEntryHook};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::info;

/// The four auditable lifecycle actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Execute,
    Undo,
    Redo,
    Restore,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Execute => "execute",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Restore => "restore",
        };
        f.write_str(name)
    }
}

/// One successful lifecycle mutation, with the field values it replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub ticket_id: TicketId,
    pub actor_id: String,
    /// Touched fields as they were before the mutation.
    pub before: FieldPatch,
    /// The same fields after the mutation.
    pub after: FieldPatch,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    #[must_use]
    pub fn new(
        action: AuditAction,
        ticket_id: TicketId,
        actor_id: impl Into<String>,
        before: FieldPatch,
        after: FieldPatch,
    ) -> Self {
        Self {
            action,
            ticket_id,
            actor_id: actor_id.into(),
            before,
            after,
            timestamp: Utc::now(),
        }
    }
}

/// Receives audit events. Implementations must not fail the caller.
pub trait AuditSink {
    fn record(&self, event: &AuditEvent);
}

/// Default sink: one structured log line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        let payload = serde_json::to_string(event).unwrap_or_else(|_| String::from("{}"));
        info!(
            action = %event.action,
            ticket_id = %event.ticket_id,
            actor_id = %event.actor_id,
            "audit: {payload}"
        );
    }
}

/// Sink that retains events in memory, for tests and session inspection.
///
/// Clones share one buffer, so a caller can hand the sink to a desk and
/// keep a handle for reading what it emitted. `Rc<RefCell<..>>` because
/// the sink, like the rest of the subsystem, lives inside a single
/// logical caller context.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    events: Rc<RefCell<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

/// The observable side effects of a successful lifecycle mutation: the
/// audit sink plus the state-entry hook. Passed by reference into
/// execute/undo/redo/restore so the layers stay free of owned globals.
#[derive(Clone, Copy)]
pub struct Effects<'a> {
    pub audit: &'a dyn AuditSink,
    pub entry: &'a dyn EntryHook,
}

impl<'a> Effects<'a> {
    #[must_use]
    pub fn new(audit: &'a dyn AuditSink, entry: &'a dyn EntryHook) -> Self {
        Self { audit, entry }
    }
}

impl Effects<'static> {
    /// Tracing-backed audit plus log-line entry hook.
    #[must_use]
    pub fn logging() -> Self {
        Self {
            audit: &TracingAuditSink,
            entry: &LogEntryHook,
        }
    }

    /// No audit, no hook. For tests and silent embeddings.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            audit: &NullAuditSink,
            entry: &NullEntryHook,
        }
    }
}
