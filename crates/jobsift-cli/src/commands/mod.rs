//! Subcommand implementations and shared config loading.

pub mod config_cmd;
pub mod run;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::Context;
use jobsift_types::config::Config;
use tracing::debug;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "JOBSIFT_CONFIG";

/// Find a config file.
///
/// Order: `JOBSIFT_CONFIG` > `./jobsift.json` > `~/.jobsift/config.json`.
/// The env var path is returned even if it does not exist, so that
/// [`load_config`] can report it.
pub fn discover_config_path(
    env_path: Option<String>,
    cwd: &Path,
    home_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = env_path.filter(|p| !p.trim().is_empty()) {
        return Some(PathBuf::from(path));
    }

    let local = cwd.join("jobsift.json");
    if local.exists() {
        return Some(local);
    }

    let home = home_dir?.join(".jobsift").join("config.json");
    home.exists().then_some(home)
}

/// Load configuration.
///
/// A path given by `--config` or `JOBSIFT_CONFIG` must exist. Finding no
/// file at all falls back to defaults.
pub fn load_config(config_override: Option<&str>) -> anyhow::Result<Config> {
    let path = match config_override {
        Some(path_str) => Some(PathBuf::from(path_str)),
        None => {
            let cwd = std::env::current_dir().unwrap_or_default();
            discover_config_path(std::env::var(CONFIG_ENV).ok(), &cwd, dirs::home_dir())
        }
    };
    if let Some(path) = path.as_ref().filter(|p| !p.exists()) {
        anyhow::bail!("config file not found: {}", path.display());
    }

    let Some(path) = path else {
        debug!("no config file found, using defaults");
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: Config = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    debug!(path = %path.display(), "config loaded");
    Ok(config)
}
