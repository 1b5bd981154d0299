//! `ward show` — full detail for one ticket, including its transition log.

use crate::config::ProjectConfig;
use crate::output::{CliError, OutputMode, render, render_error};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::Path;
use ward_core::model::ticket::{TicketId, TicketRecord};
use ward_core::store::StoredNote;
use ward_core::store::sqlite::SqliteStore;
use ward_core::{Status, TicketStore};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Ticket ID to show.
    pub id: String,
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    #[serde(flatten)]
    record: TicketRecord,
    next_statuses: Vec<Status>,
    history: Vec<HistoryLine>,
}

#[derive(Debug, Serialize)]
struct HistoryLine {
    status: String,
    actor_id: String,
    note: Option<String>,
    at: String,
}

impl From<StoredNote> for HistoryLine {
    fn from(note: StoredNote) -> Self {
        Self {
            status: note.status.to_string(),
            actor_id: note.actor_id,
            note: note.note,
            at: note.created_at.to_rfc3339(),
        }
    }
}

/// Fetch the record, or report and bail when the id is unknown.
pub fn fetch_ticket(
    store: &mut SqliteStore,
    raw_id: &str,
    output: OutputMode,
) -> Result<TicketRecord> {
    let id: TicketId = raw_id.parse()?;
    match store.find(&id)? {
        Some(record) => Ok(record),
        None => {
            let msg = format!("ticket '{raw_id}' not found");
            render_error(
                output,
                &CliError::with_details(
                    &msg,
                    "Check the ticket ID with 'ward list'",
                    "E2001",
                ),
            )?;
            anyhow::bail!(msg);
        }
    }
}

pub fn run_show(
    args: &ShowArgs,
    config: &ProjectConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut store = super::open_project_store(project_root, config, output)?;
    let record = fetch_ticket(&mut store, &args.id, output)?;
    let history = store
        .notes_for(&record.id)?
        .into_iter()
        .map(HistoryLine::from)
        .collect();

    let result = ShowOutput {
        next_statuses: record.status.successors().to_vec(),
        record,
        history,
    };

    render(output, &result, |r, w| {
        writeln!(w, "{}  [{}]", r.record.id, r.record.status)?;
        writeln!(w, "{:<12} {}", "title:", r.record.title)?;
        if !r.record.description.is_empty() {
            writeln!(w, "{:<12} {}", "description:", r.record.description)?;
        }
        writeln!(w, "{:<12} {}", "location:", r.record.location)?;
        writeln!(w, "{:<12} {}", "priority:", r.record.priority)?;
        writeln!(
            w,
            "{:<12} {}",
            "technician:",
            r.record.assigned_technician_id.as_deref().unwrap_or("-")
        )?;
        let next: Vec<String> = r.next_statuses.iter().map(ToString::to_string).collect();
        writeln!(
            w,
            "{:<12} {}",
            "next:",
            if next.is_empty() {
                "(terminal)".to_string()
            } else {
                next.join(", ")
            }
        )?;
        if !r.history.is_empty() {
            writeln!(w)?;
            writeln!(w, "history:")?;
            for line in &r.history {
                write!(w, "  {} -> {} by {}", line.at, line.status, line.actor_id)?;
                match &line.note {
                    Some(note) => writeln!(w, " ({note})")?,
                    None => writeln!(w)?,
                }
            }
        }
        Ok(())
    })
}
