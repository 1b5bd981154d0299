//! Command handlers, one module per subcommand, plus the shared project
//! discovery helpers they all go through.

pub mod assign;
pub mod init;
pub mod list;
pub mod new;
pub mod priority;
pub mod session;
pub mod show;
pub mod status;

use crate::config::ProjectConfig;
use crate::output::{CliError, OutputMode, fail_lifecycle, render, render_error};
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use ward_core::store::sqlite::SqliteStore;
use ward_core::{CommandRequest, TicketDesk, TicketStore};

/// Walk up from `start` looking for a `.ward/` project directory.
pub fn find_ward_dir(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(".ward");
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Locate the project and open its ticket database, reporting a structured
/// error when there is no project to open.
pub fn open_project_store(
    project_root: &Path,
    config: &ProjectConfig,
    output: OutputMode,
) -> Result<SqliteStore> {
    let Some(ward_dir) = find_ward_dir(project_root) else {
        let msg = "Not a ward project: .ward directory not found";
        render_error(
            output,
            &CliError::with_details(
                msg,
                "Run 'ward init' to create a new ward project",
                "not_a_project",
            ),
        )?;
        anyhow::bail!(msg);
    };

    let db_path = ward_dir.join(&config.desk.db_file);
    Ok(SqliteStore::open(&db_path)?)
}

/// Result shape shared by the one-shot mutating commands.
#[derive(Debug, Serialize)]
pub struct MutationOutput {
    pub ok: bool,
    pub ticket_id: String,
    pub action: String,
    pub status: String,
    pub priority: String,
    pub technician: Option<String>,
}

/// Run one named command against the project store and report the ticket
/// as it stands afterwards.
pub fn execute_one_shot(
    request: CommandRequest,
    action: &str,
    config: &ProjectConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let store = open_project_store(project_root, config, output)?;
    let ticket_id = match &request {
        CommandRequest::AssignTechnician { ticket_id, .. }
        | CommandRequest::UpdateStatus { ticket_id, .. }
        | CommandRequest::UpdatePriority { ticket_id, .. } => ticket_id.clone(),
    };

    let mut desk = TicketDesk::new(store);
    desk.execute_named(request)
        .map_err(|e| fail_lifecycle(output, &e))?;

    let record = desk
        .store_mut()
        .find(&ticket_id)?
        .ok_or_else(|| anyhow::anyhow!("ticket '{ticket_id}' vanished mid-command"))?;

    let result = MutationOutput {
        ok: true,
        ticket_id: ticket_id.to_string(),
        action: action.to_string(),
        status: record.status.to_string(),
        priority: record.priority.to_string(),
        technician: record.assigned_technician_id,
    };
    render(output, &result, |r, w| {
        writeln!(
            w,
            "✓ {}: {} (now {}, {}{})",
            r.ticket_id,
            r.action,
            r.status,
            r.priority,
            r.technician
                .as_deref()
                .map(|t| format!(", {t}"))
                .unwrap_or_default()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::find_ward_dir;
    use tempfile::TempDir;

    #[test]
    fn find_ward_dir_walks_up() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(".ward")).unwrap();
        let nested = root.join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_ward_dir(&nested).expect("should find project");
        assert_eq!(found, root.join(".ward"));
    }

    #[test]
    fn find_ward_dir_none_outside_projects() {
        let dir = TempDir::new().unwrap();
        assert!(find_ward_dir(dir.path()).is_none());
    }
}
