//! `ward assign` — put a pending ticket in a technician's hands.

use crate::config::ProjectConfig;
use crate::output::OutputMode;
use anyhow::Result;
use clap::Args;
use std::path::Path;
use ward_core::CommandRequest;
use ward_core::model::ticket::TicketId;

#[derive(Args, Debug)]
pub struct AssignArgs {
    /// Ticket ID to assign.
    pub id: String,

    /// Technician to assign to this ticket.
    #[arg(value_name = "TECHNICIAN")]
    pub technician: String,

    /// Optional note recorded with the assignment.
    #[arg(long)]
    pub note: Option<String>,
}

pub fn run_assign(
    args: &AssignArgs,
    actor: &str,
    config: &ProjectConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let ticket_id: TicketId = args.id.parse()?;
    super::execute_one_shot(
        CommandRequest::AssignTechnician {
            ticket_id,
            technician_id: args.technician.clone(),
            actor_id: actor.to_string(),
            note: args.note.clone(),
        },
        "assigned",
        config,
        output,
        project_root,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::init::{InitArgs, run_init};
    use crate::cmd::new::{NewArgs, run_new};
    use clap::Parser;
    use tempfile::TempDir;
    use ward_core::model::ticket::Priority;
    use ward_core::{Status, TicketStore};

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: AssignArgs,
    }

    #[test]
    fn assign_args_parse() {
        let w = Wrapper::parse_from(["test", "tk-abc123", "tech-a", "--note", "routing"]);
        assert_eq!(w.args.id, "tk-abc123");
        assert_eq!(w.args.technician, "tech-a");
        assert_eq!(w.args.note.as_deref(), Some("routing"));
    }

    #[test]
    fn assign_moves_pending_ticket_to_assigned() {
        let dir = TempDir::new().unwrap();
        run_init(&InitArgs { force: false }, dir.path()).expect("init");
        let config = ProjectConfig::default();
        run_new(
            &NewArgs {
                title: "Blocked drain".into(),
                description: String::new(),
                location: "7 River Rd".into(),
                priority: Priority::Normal,
            },
            &config,
            OutputMode::Json,
            dir.path(),
        )
        .expect("new");

        let mut store =
            crate::cmd::open_project_store(dir.path(), &config, OutputMode::Json).unwrap();
        let id = store.list_tickets().unwrap()[0].id.clone();

        run_assign(
            &AssignArgs {
                id: id.to_string(),
                technician: "tech-b".into(),
                note: None,
            },
            "admin-1",
            &config,
            OutputMode::Json,
            dir.path(),
        )
        .expect("assign should succeed");

        let record = store.find(&id).unwrap().unwrap();
        assert_eq!(record.status, Status::Assigned);
        assert_eq!(record.assigned_technician_id.as_deref(), Some("tech-b"));
    }

    #[test]
    fn assign_fails_for_non_pending_ticket() {
        let dir = TempDir::new().unwrap();
        run_init(&InitArgs { force: false }, dir.path()).expect("init");
        let config = ProjectConfig::default();
        run_new(
            &NewArgs {
                title: "Fallen sign".into(),
                description: String::new(),
                location: "1 Hill St".into(),
                priority: Priority::Normal,
            },
            &config,
            OutputMode::Json,
            dir.path(),
        )
        .expect("new");

        let mut store =
            crate::cmd::open_project_store(dir.path(), &config, OutputMode::Json).unwrap();
        let id = store.list_tickets().unwrap()[0].id.clone();
        store
            .transition_status(&id, Status::Cancelled, "admin-1", None)
            .unwrap();

        let args = AssignArgs {
            id: id.to_string(),
            technician: "tech-b".into(),
            note: None,
        };
        assert!(run_assign(&args, "admin-1", &config, OutputMode::Json, dir.path()).is_err());
    }
}
