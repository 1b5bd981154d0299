#![forbid(unsafe_code)]

mod cmd;
mod config;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "ward: municipal service ticket desk",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Override actor identity (skips env and config resolution).
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }

    /// Get the actor flag as an `Option<&str>` for resolution.
    fn actor_flag(&self) -> Option<&str> {
        self.actor.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Initialize a ward project",
        long_about = "Initialize a ward project in the current directory.",
        after_help = "EXAMPLES:\n    # Initialize a project in the current directory\n    ward init"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        about = "File a new service ticket",
        after_help = "EXAMPLES:\n    # File a ticket\n    ward new --title \"Pothole on Main St\" --location \"12 Main St\"\n\n    # With priority\n    ward new --title \"Gas smell\" --location \"3 Oak Ave\" --priority urgent"
    )]
    New(cmd::new::NewArgs),

    #[command(
        about = "List tickets",
        after_help = "EXAMPLES:\n    # All tickets\n    ward list\n\n    # Only tickets awaiting review\n    ward list --status pending\n\n    # Machine-readable output\n    ward list --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        about = "Show one ticket",
        after_help = "EXAMPLES:\n    # Show a ticket with its transition history\n    ward show tk-0a1b2c"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        about = "Assign a technician to a pending ticket",
        after_help = "EXAMPLES:\n    # Assign and move to assigned in one step\n    ward assign tk-0a1b2c tech-jane"
    )]
    Assign(cmd::assign::AssignArgs),

    #[command(
        about = "Move a ticket to a new status",
        after_help = "EXAMPLES:\n    # Mark a reviewed ticket as assigned\n    ward status tk-0a1b2c assigned\n\n    # With a note\n    ward status tk-0a1b2c cancelled --note \"duplicate of tk-9f8e7d\""
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        about = "Change a ticket's priority",
        after_help = "EXAMPLES:\n    ward priority tk-0a1b2c urgent"
    )]
    Priority(cmd::priority::PriorityArgs),

    #[command(
        about = "Start an interactive admin session",
        long_about = "Start an interactive session with undo/redo history and snapshots.",
        after_help = "EXAMPLES:\n    ward session\n    ward --actor admin-1 session"
    )]
    Session(cmd::session::SessionArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("WARD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "ward=debug,info"
        } else {
            "ward=info,warn"
        })
    });

    let format = env::var("WARD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = std::env::current_dir()?;
    let output = cli.output_mode();
    let project_config = config::load_project_config(&project_root)?;
    let user_config = config::load_user_config()?;

    let actor = || config::resolve_actor(cli.actor_flag(), &project_config, &user_config);

    match cli.command {
        Commands::Init(args) => cmd::init::run_init(&args, &project_root),
        Commands::New(ref args) => cmd::new::run_new(args, &project_config, output, &project_root),
        Commands::List(ref args) => {
            cmd::list::run_list(args, &project_config, output, &project_root)
        }
        Commands::Show(ref args) => {
            cmd::show::run_show(args, &project_config, output, &project_root)
        }
        Commands::Assign(ref args) => {
            cmd::assign::run_assign(args, &actor()?, &project_config, output, &project_root)
        }
        Commands::Status(ref args) => {
            cmd::status::run_status(args, &actor()?, &project_config, output, &project_root)
        }
        Commands::Priority(ref args) => {
            cmd::priority::run_priority(args, &actor()?, &project_config, output, &project_root)
        }
        Commands::Session(ref args) => {
            cmd::session::run_session(args, &actor()?, &project_config, output, &project_root)
        }
    }
}
