//! `ward status` — move a ticket to a new lifecycle state.

use crate::config::ProjectConfig;
use crate::output::OutputMode;
use anyhow::Result;
use clap::Args;
use std::path::Path;
use ward_core::model::ticket::TicketId;
use ward_core::{CommandRequest, Status};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Ticket ID to update.
    pub id: String,

    /// Target status (must be a legal successor of the current one).
    #[arg(value_name = "STATUS")]
    pub status: Status,

    /// Optional note recorded with the transition.
    #[arg(long)]
    pub note: Option<String>,
}

pub fn run_status(
    args: &StatusArgs,
    actor: &str,
    config: &ProjectConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let ticket_id: TicketId = args.id.parse()?;
    super::execute_one_shot(
        CommandRequest::UpdateStatus {
            ticket_id,
            new_status: args.status,
            actor_id: actor.to_string(),
            note: args.note.clone(),
        },
        "status updated",
        config,
        output,
        project_root,
    )
}
