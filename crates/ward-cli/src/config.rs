//! Layered CLI configuration: project `.ward/config.toml` plus a per-user
//! file under the platform config directory. Missing files mean defaults;
//! a file that exists but does not parse is an error worth surfacing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub desk: DeskConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskConfig {
    /// Actor recorded on mutations when no `--actor` flag or env override
    /// is present.
    #[serde(default)]
    pub default_actor: Option<String>,

    /// Database file name inside `.ward/`.
    #[serde(default = "default_db_file")]
    pub db_file: String,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            default_actor: None,
            db_file: default_db_file(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub default_actor: Option<String>,
}

fn default_db_file() -> String {
    "ward.db".to_string()
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".ward/config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("ward/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve the actor identity recorded on mutations.
///
/// Precedence: `--actor` flag, `WARD_ACTOR` env, project config, user
/// config, then `USER` env as a last resort.
pub fn resolve_actor(
    flag: Option<&str>,
    project: &ProjectConfig,
    user: &UserConfig,
) -> Result<String> {
    resolve_actor_inner(
        flag,
        env::var("WARD_ACTOR").ok().as_deref(),
        project.desk.default_actor.as_deref(),
        user.default_actor.as_deref(),
        env::var("USER").ok().as_deref(),
    )
}

fn resolve_actor_inner(
    flag: Option<&str>,
    env_actor: Option<&str>,
    project_actor: Option<&str>,
    user_actor: Option<&str>,
    login_user: Option<&str>,
) -> Result<String> {
    let candidate = flag
        .or(env_actor)
        .or(project_actor)
        .or(user_actor)
        .or(login_user)
        .map(str::trim)
        .filter(|s| !s.is_empty());

    candidate.map(String::from).ok_or_else(|| {
        anyhow::anyhow!("no actor identity; pass --actor or set WARD_ACTOR")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn make_temp_dir(label: &str) -> std::path::PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("ward-config-test-{label}-{id}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("temp dir must be created");
        dir
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = make_temp_dir("project-default");
        let cfg = load_project_config(&root).expect("load should succeed");
        assert!(cfg.desk.default_actor.is_none());
        assert_eq!(cfg.desk.db_file, "ward.db");
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn project_config_parses_desk_section() {
        let root = make_temp_dir("project-parse");
        std::fs::create_dir_all(root.join(".ward")).expect("create .ward");
        std::fs::write(
            root.join(".ward/config.toml"),
            "[desk]\ndefault_actor = \"admin-9\"\ndb_file = \"desk.db\"\n",
        )
        .expect("write config");

        let cfg = load_project_config(&root).expect("load should succeed");
        assert_eq!(cfg.desk.default_actor.as_deref(), Some("admin-9"));
        assert_eq!(cfg.desk.db_file, "desk.db");
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn malformed_project_config_is_an_error() {
        let root = make_temp_dir("project-bad");
        std::fs::create_dir_all(root.join(".ward")).expect("create .ward");
        std::fs::write(root.join(".ward/config.toml"), "desk = 3\n").expect("write config");
        assert!(load_project_config(&root).is_err());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn actor_flag_wins_over_everything() {
        let actor = resolve_actor_inner(
            Some("flag"),
            Some("env"),
            Some("project"),
            Some("user"),
            Some("login"),
        )
        .expect("resolve should succeed");
        assert_eq!(actor, "flag");
    }

    #[test]
    fn actor_env_wins_over_configs() {
        let actor = resolve_actor_inner(None, Some("env"), Some("project"), Some("user"), None)
            .expect("resolve should succeed");
        assert_eq!(actor, "env");
    }

    #[test]
    fn actor_falls_back_to_login_user() {
        let actor = resolve_actor_inner(None, None, None, None, Some("login"))
            .expect("resolve should succeed");
        assert_eq!(actor, "login");
    }

    #[test]
    fn no_actor_anywhere_is_an_error() {
        assert!(resolve_actor_inner(None, None, None, None, None).is_err());
    }

    #[test]
    fn blank_actor_is_rejected() {
        assert!(resolve_actor_inner(Some("   "), None, None, None, None).is_err());
    }
}
