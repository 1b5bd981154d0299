//! `ward session` — an interactive admin session.
//!
//! One-shot subcommands each open a fresh desk, so their history dies with
//! the process. A session keeps a single [`TicketDesk`] alive across many
//! commands, which is what makes `undo`, `redo`, and snapshots usable.

use crate::config::ProjectConfig;
use crate::output::OutputMode;
use anyhow::Result;
use clap::Args;
use std::io::{self, BufRead, Write};
use std::path::Path;
use ward_core::model::ticket::{Priority, TicketId};
use ward_core::store::sqlite::SqliteStore;
use ward_core::{CommandRequest, LifecycleError, Status, TicketDesk, TicketStore};

#[derive(Args, Debug)]
pub struct SessionArgs {}

const HELP: &str = "\
commands:
  assign <id> <technician> [note..]   assign a pending ticket
  status <id> <status> [note..]       move to a successor status
  priority <id> <priority> [note..]   change priority
  undo                                undo the last applied command
  redo                                redo the last undone command
  history                             list recorded commands, oldest first
  clear                               drop the command history
  snapshot <id> [label..]             capture a snapshot of a ticket
  snapshots                           list stored snapshots
  restore <key>                       restore a snapshot by key
  drop <key>                          delete a snapshot by key
  show <id>                           show one ticket
  list                                list all tickets
  help                                this text
  quit                                end the session
";

pub struct Session {
    desk: TicketDesk<SqliteStore>,
    actor: String,
}

impl Session {
    pub fn new(store: SqliteStore, actor: String) -> Self {
        Self {
            desk: TicketDesk::new(store),
            actor,
        }
    }

    /// Handle one input line. Returns `false` when the session should end.
    /// Command failures are reported to `w` and never end the session.
    pub fn handle_line(&mut self, line: &str, w: &mut dyn Write) -> io::Result<bool> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, rest)) = words.split_first() else {
            return Ok(true);
        };

        let outcome = match verb {
            "quit" | "exit" => return Ok(false),
            "help" => {
                write!(w, "{HELP}")?;
                Ok(())
            }
            "assign" => self.mutate(rest, w, |id, target, note, actor| {
                Ok(CommandRequest::AssignTechnician {
                    ticket_id: id,
                    technician_id: target.to_string(),
                    actor_id: actor,
                    note,
                })
            }),
            "status" => self.mutate(rest, w, |id, target, note, actor| {
                Ok(CommandRequest::UpdateStatus {
                    ticket_id: id,
                    new_status: target.parse::<Status>().map_err(|e| e.to_string())?,
                    actor_id: actor,
                    note,
                })
            }),
            "priority" => self.mutate(rest, w, |id, target, note, actor| {
                Ok(CommandRequest::UpdatePriority {
                    ticket_id: id,
                    new_priority: target.parse::<Priority>().map_err(|e| e.to_string())?,
                    actor_id: actor,
                    note,
                })
            }),
            "undo" => {
                let result = self.desk.undo_last();
                report(result, w, "undone")
            }
            "redo" => {
                let result = self.desk.redo_last();
                report(result, w, "redone")
            }
            "history" => {
                let entries = self.desk.list_history();
                if entries.is_empty() {
                    writeln!(w, "(empty)")?;
                }
                for (i, entry) in entries.iter().enumerate() {
                    let marker = if entry.executed { "*" } else { " " };
                    writeln!(w, "{:>3} {marker} {}", i + 1, entry.description)?;
                }
                Ok(())
            }
            "clear" => {
                self.desk.clear_history();
                writeln!(w, "history cleared")?;
                Ok(())
            }
            "snapshot" => self.snapshot(rest, w),
            "snapshots" => {
                let summaries = self.desk.list_snapshots();
                if summaries.is_empty() {
                    writeln!(w, "(none)")?;
                }
                for s in summaries {
                    writeln!(w, "{}  {}  {}  {}", s.key, s.ticket_id, s.taken_at, s.label)?;
                }
                Ok(())
            }
            "restore" => match rest {
                [key] => {
                    let actor = self.actor.clone();
                    let result = self.desk.restore_snapshot(key, &actor);
                    report(result, w, "restored")
                }
                _ => Err("usage: restore <key>".to_string()),
            },
            "drop" => match rest {
                [key] => {
                    if self.desk.delete_snapshot(key) {
                        writeln!(w, "dropped {key}")?;
                    } else {
                        writeln!(w, "no snapshot '{key}'")?;
                    }
                    Ok(())
                }
                _ => Err("usage: drop <key>".to_string()),
            },
            "show" => self.show(rest, w),
            "list" => match self.desk.store_mut().list_tickets() {
                Ok(tickets) => {
                    for t in tickets {
                        writeln!(w, "{}  {}  {}  {}", t.id, t.status, t.priority, t.title)?;
                    }
                    Ok(())
                }
                Err(e) => Err(e.to_string()),
            },
            other => Err(format!("unknown command '{other}' (try 'help')")),
        };

        if let Err(message) = outcome {
            writeln!(w, "error: {message}")?;
        }
        Ok(true)
    }

    fn mutate(
        &mut self,
        rest: &[&str],
        w: &mut dyn Write,
        build: impl FnOnce(TicketId, &str, Option<String>, String) -> Result<CommandRequest, String>,
    ) -> Result<(), String> {
        let [raw_id, target, note @ ..] = rest else {
            return Err("usage: <command> <id> <value> [note..]".to_string());
        };
        let id = raw_id.parse::<TicketId>().map_err(|e| e.to_string())?;
        let note = if note.is_empty() {
            None
        } else {
            Some(note.join(" "))
        };
        let request = build(id.clone(), target, note, self.actor.clone())?;
        match self.desk.execute_named(request) {
            Ok(()) => {
                let _ = writeln!(w, "ok: {id}");
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    fn snapshot(&mut self, rest: &[&str], w: &mut dyn Write) -> Result<(), String> {
        let [raw_id, label @ ..] = rest else {
            return Err("usage: snapshot <id> [label..]".to_string());
        };
        let id = raw_id.parse::<TicketId>().map_err(|e| e.to_string())?;
        let label = if label.is_empty() {
            None
        } else {
            Some(label.join(" "))
        };
        match self.desk.create_snapshot(id, label) {
            Ok(key) => {
                let _ = writeln!(w, "saved {key}");
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    fn show(&mut self, rest: &[&str], w: &mut dyn Write) -> Result<(), String> {
        let [raw_id] = rest else {
            return Err("usage: show <id>".to_string());
        };
        let id = raw_id.parse::<TicketId>().map_err(|e| e.to_string())?;
        let record = self
            .desk
            .store_mut()
            .find(&id)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("ticket '{id}' not found"))?;
        let _ = writeln!(
            w,
            "{}  {}  {}  {}  technician={}",
            record.id,
            record.status,
            record.priority,
            record.title,
            record.assigned_technician_id.as_deref().unwrap_or("-")
        );
        Ok(())
    }

}

fn report(result: Result<(), LifecycleError>, w: &mut dyn Write, verb: &str) -> Result<(), String> {
    match result {
        Ok(()) => {
            let _ = writeln!(w, "{verb}");
            Ok(())
        }
        Err(e) => Err(e.to_string()),
    }
}

pub fn run_session(
    _args: &SessionArgs,
    actor: &str,
    config: &ProjectConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let store = super::open_project_store(project_root, config, output)?;
    let mut session = Session::new(store, actor.to_string());

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "ward session as {actor} (type 'help')")?;
    loop {
        write!(out, "ward> ")?;
        out.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if !session.handle_line(&line, &mut out)? {
            break;
        }
    }
    Ok(())
}
