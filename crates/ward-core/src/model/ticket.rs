//! Ticket records and the field-patch vocabulary of the persistence port.

use crate::state::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

/// Field names accepted by [`crate::port::TicketStore::update_fields`].
///
/// A patch maps these names to JSON values; `Null` clears an optional field.
pub mod fields {
    pub const STATUS: &str = "status";
    pub const PRIORITY: &str = "priority";
    pub const ASSIGNED_TECHNICIAN_ID: &str = "assigned_technician_id";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const LOCATION: &str = "location";

    /// Every patchable field, in canonical order.
    pub const ALL: [&str; 6] = [
        STATUS,
        PRIORITY,
        ASSIGNED_TECHNICIAN_ID,
        TITLE,
        DESCRIPTION,
        LOCATION,
    ];
}

/// A partial update applied to one ticket as a single logical write.
pub type FieldPatch = BTreeMap<String, serde_json::Value>;

/// Unique identifier of a service ticket (`tk-` prefixed by convention).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

/// Error returned when a ticket id is empty or whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTicketId;

impl fmt::Display for InvalidTicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ticket id must be non-empty")
    }
}

impl std::error::Error for InvalidTicketId {}

impl TicketId {
    /// Create a validated ticket id. Input is trimmed; empty ids are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTicketId`] if the trimmed input is empty.
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidTicketId> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidTicketId);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TicketId {
    type Err = InvalidTicketId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Operator-set priority of a ticket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown priority name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPriority {
    pub raw: String,
}

impl fmt::Display for UnknownPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown priority '{}': expected one of low, normal, high, urgent",
            self.raw
        )
    }
}

impl std::error::Error for UnknownPriority {}

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(UnknownPriority { raw: s.to_string() }),
        }
    }
}

/// The full persisted record for one service ticket.
///
/// Owned by the record store; every mutation goes through the persistence
/// port, never through direct field assignment by the lifecycle layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: TicketId,
    pub status: Status,
    pub priority: Priority,
    pub assigned_technician_id: Option<String>,
    pub title: String,
    pub description: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketRecord {
    /// A fresh `pending` record with the given identity and intake details.
    #[must_use]
    pub fn new(
        id: TicketId,
        title: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status: Status::Pending,
            priority,
            assigned_technician_id: None,
            title: title.into(),
            description: description.into(),
            location: location.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Current value of one patchable field as a JSON value.
    ///
    /// Returns `None` for names outside [`fields::ALL`].
    #[must_use]
    pub fn field_value(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            fields::STATUS => serde_json::to_value(self.status).ok(),
            fields::PRIORITY => serde_json::to_value(self.priority).ok(),
            fields::ASSIGNED_TECHNICIAN_ID => Some(
                self.assigned_technician_id
                    .as_ref()
                    .map_or(serde_json::Value::Null, |t| {
                        serde_json::Value::String(t.clone())
                    }),
            ),
            fields::TITLE => Some(serde_json::Value::String(self.title.clone())),
            fields::DESCRIPTION => Some(serde_json::Value::String(self.description.clone())),
            fields::LOCATION => Some(serde_json::Value::String(self.location.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Priority, TicketId, TicketRecord, fields};
    use crate::state::Status;
    use chrono::Utc;
    use std::str::FromStr;

    #[test]
    fn ticket_id_trims_and_rejects_empty() {
        assert_eq!(TicketId::new(" tk-7f3a ").unwrap().as_str(), "tk-7f3a");
        assert!(TicketId::new("   ").is_err());
        assert!(TicketId::new("").is_err());
    }

    #[test]
    fn priority_parse_roundtrips() {
        for p in [Priority::Low, Priority::Normal, Priority::High, Priority::Urgent] {
            assert_eq!(Priority::from_str(&p.to_string()).unwrap(), p);
        }
        assert!(Priority::from_str("critical").is_err());
    }

    #[test]
    fn new_record_starts_pending_and_unassigned() {
        let now = Utc::now();
        let record = TicketRecord::new(
            TicketId::new("tk-1").unwrap(),
            "Pothole on Elm St",
            "Deep pothole near the crosswalk",
            "Elm St & 4th Ave",
            Priority::High,
            now,
        );
        assert_eq!(record.status, Status::Pending);
        assert!(record.assigned_technician_id.is_none());
        assert_eq!(record.created_at, now);
        assert_eq!(record.updated_at, now);
    }

    #[test]
    fn field_value_covers_every_patchable_field() {
        let record = TicketRecord::new(
            TicketId::new("tk-1").unwrap(),
            "t",
            "d",
            "l",
            Priority::Normal,
            Utc::now(),
        );
        for name in fields::ALL {
            assert!(record.field_value(name).is_some(), "missing field {name}");
        }
        assert!(record.field_value("nope").is_none());
    }

    #[test]
    fn unassigned_technician_reads_as_json_null() {
        let record = TicketRecord::new(
            TicketId::new("tk-1").unwrap(),
            "t",
            "d",
            "l",
            Priority::Normal,
            Utc::now(),
        );
        assert_eq!(
            record.field_value(fields::ASSIGNED_TECHNICIAN_ID).unwrap(),
            serde_json::Value::Null
        );
    }
}
