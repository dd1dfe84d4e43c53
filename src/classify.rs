//! Archive-candidate heuristics. The rest of the crate only consumes the
//! boolean and the reason text.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::model::{RepositorySnapshot, STALE_AFTER_DAYS};

const UNTOUCHED_FORK_DAYS: i64 = 180;
const EMPTY_REPO_DAYS: i64 = 90;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub is_candidate: bool,
    pub reason: String,
}

impl Verdict {
    fn keep(reason: impl Into<String>) -> Self {
        Self {
            is_candidate: false,
            reason: reason.into(),
        }
    }

    fn candidate(reason: impl Into<String>) -> Self {
        Self {
            is_candidate: true,
            reason: reason.into(),
        }
    }
}

pub trait ArchiveClassifier: Send + Sync {
    fn classify(&self, repo: &RepositorySnapshot) -> Verdict;
}

#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    protected: GlobSet,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self {
            protected: GlobSet::empty(),
        }
    }
}

impl HeuristicClassifier {
    /// `patterns` are matched against the short repository name.
    pub fn with_protected(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for p in patterns {
            builder.add(Glob::new(p).with_context(|| format!("invalid protected pattern {p:?}"))?);
        }
        Ok(Self {
            protected: builder.build().context("build protected pattern set")?,
        })
    }

    pub fn is_protected(&self, repo: &RepositorySnapshot) -> bool {
        self.protected.is_match(&repo.name)
    }
}

impl ArchiveClassifier for HeuristicClassifier {
    fn classify(&self, repo: &RepositorySnapshot) -> Verdict {
        if repo.is_archived {
            return Verdict::keep("already archived");
        }
        if self.is_protected(repo) {
            return Verdict::keep("protected by config");
        }

        let days = repo.days_since_activity;
        if days > STALE_AFTER_DAYS && repo.stars == 0 {
            return Verdict::candidate(format!("no pushes in {} days and no stars", days));
        }
        if repo.is_fork && days > UNTOUCHED_FORK_DAYS {
            return Verdict::candidate(format!("fork untouched for {} days", days));
        }
        if repo.description.trim().is_empty()
            && repo.stars == 0
            && repo.forks == 0
            && days > EMPTY_REPO_DAYS
        {
            return Verdict::candidate(format!(
                "no description, stars or forks; idle {} days",
                days
            ));
        }
        Verdict::keep("active or engaged")
    }
}

#[cfg(test)]
#[path = "tests/classify_tests.rs"]
mod tests;
