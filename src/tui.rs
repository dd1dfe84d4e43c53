use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::classify::ArchiveClassifier;
use crate::refresh::RefreshSettings;
use crate::remote::RepoSource;
use crate::store::SharedCache;

/// Everything the interactive shell needs, assembled by the CLI.
pub struct TuiRunOptions {
    pub cache: SharedCache,
    pub source: Arc<dyn RepoSource>,
    pub classifier: Arc<dyn ArchiveClassifier>,
    pub refresh: RefreshSettings,
    pub export_dir: PathBuf,
}

pub fn run_with_options(opts: TuiRunOptions) -> Result<()> {
    crate::tui_shell::run_with_options(opts)
}
