//! JSON export of the marked set.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::classify::ArchiveClassifier;
use crate::config::write_atomic;
use crate::model::{RepositorySnapshot, fmt_rfc3339};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedRepo {
    pub name: String,
    pub full_name: String,
    pub stars: u32,
    pub forks: u32,
    pub days_since_activity: i64,
    pub reason: String,
    pub language: String,
    pub last_push: String,
    pub is_fork: bool,
    pub is_private: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub exported_at: String,
    pub owner: String,
    pub total_marked: usize,
    pub repositories: Vec<ExportedRepo>,
}

pub fn export_file_name(at: OffsetDateTime) -> String {
    format!(
        "archived-repos-{:04}-{:02}-{:02}-{:02}{:02}{:02}.json",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}

/// `reason` falls back to the classifier when the snapshot carries none.
pub fn build_document(
    owner: &str,
    marked: &[RepositorySnapshot],
    classifier: &dyn ArchiveClassifier,
    at: OffsetDateTime,
) -> ExportDocument {
    let repositories: Vec<ExportedRepo> = marked
        .iter()
        .map(|r| ExportedRepo {
            name: r.name.clone(),
            full_name: r.full_name.clone(),
            stars: r.stars,
            forks: r.forks,
            days_since_activity: r.days_since_activity,
            reason: r
                .reason
                .clone()
                .unwrap_or_else(|| classifier.classify(r).reason),
            language: r.language.clone(),
            last_push: r.pushed_at.clone(),
            is_fork: r.is_fork,
            is_private: r.is_private,
        })
        .collect();
    ExportDocument {
        exported_at: fmt_rfc3339(at),
        owner: owner.to_string(),
        total_marked: repositories.len(),
        repositories,
    }
}

/// Writes the document into `dir` and returns the file path.
pub fn write_export(dir: &Path, doc: &ExportDocument, at: OffsetDateTime) -> Result<PathBuf> {
    let path = dir.join(export_file_name(at));
    let mut bytes = serde_json::to_vec_pretty(doc).context("serialize export")?;
    bytes.push(b'\n');
    write_atomic(&path, &bytes).with_context(|| format!("write export {}", path.display()))?;
    tracing::info!(path = %path.display(), count = doc.total_marked, "exported marked repositories");
    Ok(path)
}

#[cfg(test)]
#[path = "tests/export_tests.rs"]
mod tests;
