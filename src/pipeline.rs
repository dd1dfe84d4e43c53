//! Pure view pipeline: visibility, category filter, language, search, sort
//! and pagination over the cached repository set. No I/O.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::model::{NO_LANGUAGE, RepositorySnapshot};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterKind {
    #[default]
    All,
    Stale,
    ZeroEngagement,
    Forks,
}

impl FilterKind {
    pub fn label(self) -> &'static str {
        match self {
            FilterKind::All => "all",
            FilterKind::Stale => "stale",
            FilterKind::ZeroEngagement => "zero-engagement",
            FilterKind::Forks => "forks",
        }
    }

    pub fn next(self) -> Self {
        match self {
            FilterKind::All => FilterKind::Stale,
            FilterKind::Stale => FilterKind::ZeroEngagement,
            FilterKind::ZeroEngagement => FilterKind::Forks,
            FilterKind::Forks => FilterKind::All,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Some(FilterKind::All),
            "stale" => Some(FilterKind::Stale),
            "zero-engagement" | "zero" | "unstarred" => Some(FilterKind::ZeroEngagement),
            "forks" | "fork" => Some(FilterKind::Forks),
            _ => None,
        }
    }

    fn admits(self, repo: &RepositorySnapshot) -> bool {
        match self {
            FilterKind::All => true,
            FilterKind::Stale => repo.is_stale(),
            FilterKind::ZeroEngagement => repo.stars == 0,
            FilterKind::Forks => repo.is_fork,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Name,
    Activity,
    Stars,
    Language,
}

impl SortField {
    pub fn label(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Activity => "activity",
            SortField::Stars => "stars",
            SortField::Language => "language",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortField::Name => SortField::Activity,
            SortField::Activity => SortField::Stars,
            SortField::Stars => SortField::Language,
            SortField::Language => SortField::Name,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Some(SortField::Name),
            "activity" | "pushed" => Some(SortField::Activity),
            "stars" => Some(SortField::Stars),
            "language" | "lang" => Some(SortField::Language),
            _ => None,
        }
    }

    /// Ascending order. For activity that means most recently pushed first.
    fn compare(self, a: &RepositorySnapshot, b: &RepositorySnapshot) -> Ordering {
        match self {
            SortField::Name => cmp_ci(&a.name, &b.name),
            SortField::Activity => a.days_since_activity.cmp(&b.days_since_activity),
            SortField::Stars => a.stars.cmp(&b.stars),
            SortField::Language => cmp_ci(&a.language, &b.language),
        }
    }
}

fn cmp_ci(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewQuery {
    pub filter: FilterKind,
    /// `Some(NO_LANGUAGE)` selects repositories without a primary language.
    pub language: Option<String>,
    pub search: String,
    pub show_private: bool,
    pub show_archived: bool,
    pub sort_field: SortField,
    pub sort_ascending: bool,
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self {
            filter: FilterKind::All,
            language: None,
            search: String::new(),
            show_private: false,
            show_archived: false,
            sort_field: SortField::Name,
            sort_ascending: true,
        }
    }
}

impl ViewQuery {
    fn admits(&self, repo: &RepositorySnapshot, needle: &str) -> bool {
        if repo.is_private && !self.show_private {
            return false;
        }
        if repo.is_archived && !self.show_archived {
            return false;
        }
        if !self.filter.admits(repo) {
            return false;
        }
        if let Some(lang) = &self.language {
            let matches = if lang == NO_LANGUAGE {
                repo.language.is_empty()
            } else {
                repo.language == *lang
            };
            if !matches {
                return false;
            }
        }
        needle.is_empty() || repo.name.to_lowercase().contains(needle)
    }
}

/// Produces the ordered visible subset. The input is left untouched.
pub fn render(repos: &[RepositorySnapshot], query: &ViewQuery) -> Vec<RepositorySnapshot> {
    let needle = query.search.trim().to_lowercase();
    let mut out: Vec<RepositorySnapshot> = repos
        .iter()
        .filter(|r| query.admits(r, &needle))
        .cloned()
        .collect();

    let field = query.sort_field;
    if query.sort_ascending {
        out.sort_by(|a, b| field.compare(a, b));
    } else {
        out.sort_by(|a, b| field.compare(a, b).reverse());
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub cursor: usize,
    pub offset: usize,
    pub start: usize,
    pub end: usize,
}

/// Clamps cursor and offset to a list of `len` rows shown `height` at a time.
pub fn paginate(len: usize, cursor: usize, offset: usize, height: usize) -> Window {
    if len == 0 {
        return Window {
            cursor: 0,
            offset: 0,
            start: 0,
            end: 0,
        };
    }
    let height = height.max(1);
    let cursor = cursor.min(len - 1);
    let mut offset = offset.min(cursor);
    if cursor >= offset + height {
        offset = cursor + 1 - height;
    }
    let end = (offset + height).min(len);
    Window {
        cursor,
        offset,
        start: offset,
        end,
    }
}

/// Distinct languages for the picker, with the sentinel when any repo has none.
pub fn languages(repos: &[RepositorySnapshot]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut missing = false;
    for r in repos {
        if r.language.is_empty() {
            missing = true;
        } else {
            seen.insert(r.language.clone());
        }
    }
    let mut out: Vec<String> = seen.into_iter().collect();
    out.sort_by(|a, b| cmp_ci(a, b));
    if missing {
        out.push(NO_LANGUAGE.to_string());
    }
    out
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub archived: usize,
    pub private: usize,
    pub forks: usize,
    pub stale: usize,
}

pub fn summarize(repos: &[RepositorySnapshot]) -> Summary {
    repos.iter().fold(Summary::default(), |mut s, r| {
        s.total += 1;
        s.archived += usize::from(r.is_archived);
        s.private += usize::from(r.is_private);
        s.forks += usize::from(r.is_fork);
        s.stale += usize::from(r.is_stale());
        s
    })
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
