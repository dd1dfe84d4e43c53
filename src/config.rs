use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "repo-sweep";
const CONFIG_FILE: &str = "config.json";
const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub export_dir: Option<PathBuf>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Glob patterns for repository names that are never flagged as archive
    /// candidates.
    #[serde(default)]
    pub protected: Vec<String>,

    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_version() -> u32 {
    1
}

fn default_refresh_interval_secs() -> u64 {
    3600
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            owner: None,
            refresh_interval_secs: default_refresh_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            database_path: None,
            export_dir: None,
            api_base_url: default_api_base_url(),
            protected: Vec::new(),
            log_level: None,
        }
    }
}

impl AppConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| data_dir().join("cache.db"))
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn require_owner(&self) -> Result<&str> {
        self.owner
            .as_deref()
            .filter(|o| !o.trim().is_empty())
            .context("no owner configured (pass --owner or run `repo-sweep config set --owner ...`)")
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn log_path() -> PathBuf {
    data_dir().join("repo-sweep.log")
}

/// Missing file means defaults; a present but malformed file is an error.
pub fn load(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AppConfig =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    if cfg.version != 1 {
        anyhow::bail!("unsupported config version {}", cfg.version);
    }
    Ok(cfg)
}

pub fn save(path: &Path, cfg: &AppConfig) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(cfg).context("serialize config")?;
    write_atomic(path, &bytes).with_context(|| format!("write {}", path.display()))
}

pub fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).context("create parent directories")?;
    }
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    fs::write(&tmp, bytes).with_context(|| format!("write temp file {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
