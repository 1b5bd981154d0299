//! `ward list` — list tickets, optionally filtered by status.

use crate::config::ProjectConfig;
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::Path;
use ward_core::Status;
use ward_core::model::ticket::TicketRecord;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show tickets in this status.
    #[arg(long)]
    pub status: Option<Status>,
}

#[derive(Debug, Serialize)]
struct ListRow {
    ticket_id: String,
    status: String,
    priority: String,
    technician: Option<String>,
    title: String,
}

impl From<&TicketRecord> for ListRow {
    fn from(record: &TicketRecord) -> Self {
        Self {
            ticket_id: record.id.to_string(),
            status: record.status.to_string(),
            priority: record.priority.to_string(),
            technician: record.assigned_technician_id.clone(),
            title: record.title.clone(),
        }
    }
}

pub fn run_list(
    args: &ListArgs,
    config: &ProjectConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut store = super::open_project_store(project_root, config, output)?;
    let rows: Vec<ListRow> = store
        .list_tickets()?
        .iter()
        .filter(|t| args.status.is_none_or(|wanted| t.status == wanted))
        .map(ListRow::from)
        .collect();

    render(output, &rows, |rows, w| {
        if rows.is_empty() {
            return writeln!(w, "no tickets");
        }
        writeln!(
            w,
            "{:<11} {:<12} {:<8} {:<12} TITLE",
            "ID", "STATUS", "PRIORITY", "TECHNICIAN"
        )?;
        for row in rows {
            writeln!(
                w,
                "{:<11} {:<12} {:<8} {:<12} {}",
                row.ticket_id,
                row.status,
                row.priority,
                row.technician.as_deref().unwrap_or("-"),
                row.title
            )?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ListArgs,
    }

    #[test]
    fn status_filter_parses() {
        let w = Wrapper::parse_from(["test", "--status", "in_progress"]);
        assert_eq!(w.args.status, Some(Status::InProgress));
    }

    #[test]
    fn no_filter_by_default() {
        let w = Wrapper::parse_from(["test"]);
        assert!(w.args.status.is_none());
    }
}
