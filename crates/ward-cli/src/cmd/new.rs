//! `ward new` — file a new service ticket.

use crate::config::ProjectConfig;
use crate::output::{OutputMode, render};
use anyhow::Result;
use chrono::Utc;
use clap::Args;
use rand::Rng;
use serde::Serialize;
use std::path::Path;
use ward_core::TicketStore;
use ward_core::model::ticket::{Priority, TicketId, TicketRecord};
use ward_core::store::sqlite::SqliteStore;

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Short summary of the reported issue.
    #[arg(long)]
    pub title: String,

    /// Longer free-form description.
    #[arg(long, default_value = "")]
    pub description: String,

    /// Where the issue was reported.
    #[arg(long)]
    pub location: String,

    /// Initial priority (low, normal, high, urgent).
    #[arg(long, default_value = "normal")]
    pub priority: Priority,
}

#[derive(Debug, Serialize)]
struct NewOutput {
    ok: bool,
    ticket_id: String,
    status: String,
    priority: String,
}

fn generate_ticket_id(store: &mut SqliteStore) -> Result<TicketId> {
    let mut rng = rand::thread_rng();
    // Retry on the rare collision; the id space is much larger than any
    // plausible ticket count.
    for _ in 0..16 {
        let id = TicketId::new(format!("tk-{:06x}", rng.gen_range(0..0x100_0000u32)))?;
        if store.find(&id)?.is_none() {
            return Ok(id);
        }
    }
    anyhow::bail!("could not generate a fresh ticket id");
}

pub fn run_new(
    args: &NewArgs,
    config: &ProjectConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut store = super::open_project_store(project_root, config, output)?;
    let id = generate_ticket_id(&mut store)?;

    let record = TicketRecord::new(
        id.clone(),
        &args.title,
        &args.description,
        &args.location,
        args.priority,
        Utc::now(),
    );
    store.create_ticket(&record)?;

    let result = NewOutput {
        ok: true,
        ticket_id: id.to_string(),
        status: record.status.to_string(),
        priority: record.priority.to_string(),
    };
    render(output, &result, |r, w| {
        writeln!(w, "✓ {}: filed ({}, {})", r.ticket_id, r.status, r.priority)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::init::{InitArgs, run_init};
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        run_init(&InitArgs { force: false }, dir.path()).expect("init");
        dir
    }

    #[test]
    fn new_files_a_pending_ticket() {
        let dir = project();
        let config = ProjectConfig::default();
        run_new(
            &NewArgs {
                title: "Broken streetlight".into(),
                description: "Out since Tuesday".into(),
                location: "5 Elm St".into(),
                priority: Priority::High,
            },
            &config,
            OutputMode::Json,
            dir.path(),
        )
        .expect("new should succeed");

        let mut store =
            super::super::open_project_store(dir.path(), &config, OutputMode::Json).unwrap();
        let tickets = store.list_tickets().unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].title, "Broken streetlight");
        assert_eq!(tickets[0].priority, Priority::High);
        assert_eq!(tickets[0].status, ward_core::Status::Pending);
        assert!(tickets[0].assigned_technician_id.is_none());
    }

    #[test]
    fn generated_ids_are_well_formed_and_fresh() {
        let dir = project();
        let config = ProjectConfig::default();
        let mut store =
            super::super::open_project_store(dir.path(), &config, OutputMode::Json).unwrap();
        let id = generate_ticket_id(&mut store).unwrap();
        assert!(id.as_str().starts_with("tk-"));
        assert_eq!(id.as_str().len(), 9);
        assert!(store.find(&id).unwrap().is_none());
    }
}
