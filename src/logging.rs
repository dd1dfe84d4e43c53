use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

const LOG_ENV: &str = "REPO_SWEEP_LOG";

/// `REPO_SWEEP_LOG` first, then `RUST_LOG`, then the configured level (or
/// `info`).
pub fn env_filter(default_level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level.unwrap_or("info")))
}

/// Non-interactive commands log to stderr so stdout stays parseable.
pub fn init_stderr(default_level: Option<&str>) -> Result<()> {
    init_with_writer(default_level, std::io::stderr)
}

/// The TUI owns the terminal, so it logs to a file instead.
pub fn init_to_file(default_level: Option<&str>, log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("create log directory")?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("open {}", log_path.display()))?;
    init_with_writer(default_level, Mutex::new(file))
}

fn init_with_writer<W>(default_level: Option<&str>, writer: W) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("init tracing: {err}"))
}
