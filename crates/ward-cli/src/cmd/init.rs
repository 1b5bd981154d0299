use anyhow::{Context as _, Result};
use clap::Args;
use std::path::Path;
use ward_core::store::sqlite::SqliteStore;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force re-initialization even if `.ward/` already exists.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[desk]\n\
    # default_actor = \"admin-1\"\n\
    db_file = \"ward.db\"\n";

const GITIGNORE: &str = "ward.db\nward.db-wal\nward.db-shm\n";

/// Execute `ward init`. Creates the project skeleton:
///
/// ```text
/// .ward/
///   ward.db        (ticket database, schema applied)
///   config.toml    (default project config template)
///   .gitignore     (database and WAL side files)
/// ```
///
/// # Errors
///
/// Returns an error if `.ward/` already exists and `--force` is not set,
/// or if any filesystem or database operation fails.
pub fn run_init(args: &InitArgs, project_root: &Path) -> Result<()> {
    let ward_dir = project_root.join(".ward");

    if ward_dir.exists() && !args.force {
        anyhow::bail!(".ward/ already exists. Use `ward init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&ward_dir)
        .with_context(|| format!("Failed to create {}", ward_dir.display()))?;

    // Opening applies the schema.
    let db_path = ward_dir.join("ward.db");
    SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to initialize database: {}", db_path.display()))?;

    let config_path = ward_dir.join("config.toml");
    std::fs::write(&config_path, CONFIG_TOML)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let gitignore_path = ward_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    println!("✓ Initialized .ward/ project structure.");
    println!();
    println!("  Database: .ward/ward.db");
    println!("  Config:   .ward/config.toml");
    println!();
    println!("Next steps:");
    println!("  Set your actor identity (required for mutations):");
    println!("    export WARD_ACTOR=your-name");
    println!();
    println!("  File your first ticket:");
    println!("    ward new --title \"Pothole on Main St\" --location \"12 Main St\"");

    Ok(())
}
