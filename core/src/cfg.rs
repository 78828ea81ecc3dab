use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::simulator::RunTiming;

/// Identifier used to compute per-app configuration and data directories.
#[derive(Clone, Copy)]
pub struct AppId {
    /// Reverse-DNS style qualifier, e.g. `"com"`.
    pub qualifier: &'static str,
    /// Organization or vendor name, e.g. `"local"`.
    pub organization: &'static str,
    /// Application name, e.g. `"deck"`.
    pub application: &'static str,
}

/// Application configuration persisted to `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tracing level to use if `RUST_LOG` is not set (e.g. `"info"`).
    pub log_level: String,
    /// Directory holding the script blobs; the app data dir when unset.
    #[serde(default)]
    pub data_dir: Option<String>,
    /// Simulated execution time before a run completes (milliseconds).
    #[serde(default = "default_run_ms")]
    pub run_ms: u64,
    /// Time a completed run stays `completed` before going idle (milliseconds).
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Listen address of the deckd control plane.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,
}

fn default_run_ms() -> u64 {
    3_000
}

fn default_settle_ms() -> u64 {
    5_000
}

fn default_http_addr() -> String {
    "127.0.0.1:7878".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: None,
            run_ms: default_run_ms(),
            settle_ms: default_settle_ms(),
            http_addr: default_http_addr(),
        }
    }
}

impl Config {
    /// Delays used by the run simulator.
    pub fn timing(&self) -> RunTiming {
        RunTiming {
            run: Duration::from_millis(self.run_ms),
            settle: Duration::from_millis(self.settle_ms),
        }
    }

    /// Resolve where the script blobs live: `data_dir` if set, else the app data dir.
    pub fn resolve_data_dir(&self, app: &AppId) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => Ok(project_dirs(app)?.data_dir().to_path_buf()),
        }
    }
}

fn project_dirs(app: &AppId) -> Result<ProjectDirs> {
    ProjectDirs::from(app.qualifier, app.organization, app.application)
        .ok_or_else(|| anyhow::anyhow!("failed to resolve ProjectDirs"))
}

/// Return the configuration directory for this app, creating it if needed.
pub fn config_dir(app: &AppId) -> Result<PathBuf> {
    let dir = project_dirs(app)?.config_dir().to_path_buf();
    fs::create_dir_all(&dir).with_context(|| format!("create config dir {}", dir.display()))?;
    Ok(dir)
}

/// Load `config.toml` from the app config dir or create a default one.
pub fn load_or_init(app: &AppId) -> Result<Config> {
    let dir = config_dir(app)?;
    load_or_init_at(&dir.join("config.toml"))
}

/// Load the config at `path`, writing the defaults there first if it is missing.
pub fn load_or_init_at(path: &Path) -> Result<Config> {
    if path.exists() {
        let txt = fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&txt)
            .with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    } else {
        let cfg = Config::default();
        save_config(path, &cfg)?;
        Ok(cfg)
    }
}

fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg)?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
