//! `ward priority` — reprioritize a ticket.

use crate::config::ProjectConfig;
use crate::output::OutputMode;
use anyhow::Result;
use clap::Args;
use std::path::Path;
use ward_core::CommandRequest;
use ward_core::model::ticket::{Priority, TicketId};

#[derive(Args, Debug)]
pub struct PriorityArgs {
    /// Ticket ID to update.
    pub id: String,

    /// New priority (low, normal, high, urgent).
    #[arg(value_name = "PRIORITY")]
    pub priority: Priority,

    /// Optional note recorded with the change.
    #[arg(long)]
    pub note: Option<String>,
}

pub fn run_priority(
    args: &PriorityArgs,
    actor: &str,
    config: &ProjectConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let ticket_id: TicketId = args.id.parse()?;
    super::execute_one_shot(
        CommandRequest::UpdatePriority {
            ticket_id,
            new_priority: args.priority,
            actor_id: actor.to_string(),
            note: args.note.clone(),
        },
        "reprioritized",
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
    use ward_core::TicketStore;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: PriorityArgs,
    }

    #[test]
    fn priority_args_parse() {
        let w = Wrapper::parse_from(["test", "tk-abc123", "urgent"]);
        assert_eq!(w.args.id, "tk-abc123");
        assert_eq!(w.args.priority, Priority::Urgent);
    }

    #[test]
    fn same_priority_is_rejected_as_noop() {
        let dir = TempDir::new().unwrap();
        run_init(&InitArgs { force: false }, dir.path()).expect("init");
        let config = ProjectConfig::default();
        run_new(
            &NewArgs {
                title: "Leaning fence".into(),
                description: String::new(),
                location: "8 Gate Ln".into(),
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

        run_priority(
            &PriorityArgs {
                id: id.to_string(),
                priority: Priority::High,
                note: None,
            },
            "admin-1",
            &config,
            OutputMode::Json,
            dir.path(),
        )
        .expect("change should succeed");
        assert_eq!(store.find(&id).unwrap().unwrap().priority, Priority::High);

        let same = PriorityArgs {
            id: id.to_string(),
            priority: Priority::High,
            note: None,
        };
        assert!(run_priority(&same, "admin-1", &config, OutputMode::Json, dir.path()).is_err());
    }
}
