use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Language filter value that matches repositories with no primary language.
pub const NO_LANGUAGE: &str = "(none)";

/// Days without a push after which a repository counts as stale.
pub const STALE_AFTER_DAYS: i64 = 365;

/// Last-known metadata for one remote repository.
///
/// `marked` and `reason` are UI-only. They are never written to the cache and
/// are recomputed whenever the visible list is rebuilt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub description: String,
    pub stars: u32,
    pub forks: u32,
    pub language: String,
    pub is_archived: bool,
    pub is_fork: bool,
    pub is_private: bool,
    /// RFC 3339, as reported by the remote.
    pub pushed_at: String,
    /// RFC 3339, as reported by the remote.
    pub created_at: String,
    pub days_since_activity: i64,

    #[serde(skip)]
    pub marked: bool,
    #[serde(skip)]
    pub reason: Option<String>,
}

impl RepositorySnapshot {
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            full_name: full_name(owner, name),
            description: String::new(),
            stars: 0,
            forks: 0,
            language: String::new(),
            is_archived: false,
            is_fork: false,
            is_private: false,
            pushed_at: String::new(),
            created_at: String::new(),
            days_since_activity: 0,
            marked: false,
            reason: None,
        }
    }

    pub fn language_label(&self) -> &str {
        if self.language.is_empty() {
            NO_LANGUAGE
        } else {
            &self.language
        }
    }

    pub fn is_stale(&self) -> bool {
        self.days_since_activity > STALE_AFTER_DAYS
    }
}

pub fn full_name(owner: &str, name: &str) -> String {
    format!("{}/{}", owner, name)
}

/// Whole days between `ts` (RFC 3339) and `now`. Unparseable or future
/// timestamps count as zero.
pub fn days_since(ts: &str, now: OffsetDateTime) -> i64 {
    match OffsetDateTime::parse(ts, &Rfc3339) {
        Ok(then) => (now - then).whole_days().max(0),
        Err(_) => 0,
    }
}

/// Current UTC time truncated to whole milliseconds, the resolution the cache
/// stores timestamps at.
pub fn now_millis() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    from_unix_millis(to_unix_millis(now)).unwrap_or(now)
}

pub fn to_unix_millis(t: OffsetDateTime) -> i64 {
    (t.unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn from_unix_millis(ms: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
}

pub fn fmt_rfc3339(t: OffsetDateTime) -> String {
    t.format(&Rfc3339).unwrap_or_else(|_| "<time>".to_string())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    Running,
    Success,
    Error,
    Partial,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Running => "running",
            SyncStatus::Success => "success",
            SyncStatus::Error => "error",
            SyncStatus::Partial => "partial",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(SyncStatus::Running),
            "success" => Some(SyncStatus::Success),
            "error" => Some(SyncStatus::Error),
            "partial" => Some(SyncStatus::Partial),
            _ => None,
        }
    }
}

/// One refresh attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncRecord {
    pub id: i64,
    pub owner: String,
    pub started_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
    pub status: SyncStatus,
    pub repos_fetched: u64,
    pub repos_inserted: u64,
    pub repos_updated: u64,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
}

/// Final state written to a running sync row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncOutcome {
    pub status: SyncStatus,
    pub completed_at: OffsetDateTime,
    pub repos_fetched: u64,
    pub repos_inserted: u64,
    pub repos_updated: u64,
    pub error_message: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeAction {
    Archived,
    Unarchived,
    Marked,
    Unmarked,
    Deleted,
    Synced,
}

impl ChangeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeAction::Archived => "archived",
            ChangeAction::Unarchived => "unarchived",
            ChangeAction::Marked => "marked",
            ChangeAction::Unmarked => "unmarked",
            ChangeAction::Deleted => "deleted",
            ChangeAction::Synced => "synced",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Actor {
    User,
    System,
    Sync,
}

impl Actor {
    pub fn as_str(self) -> &'static str {
        match self {
            Actor::User => "user",
            Actor::System => "system",
            Actor::Sync => "sync",
        }
    }
}

/// Audit row to append. `previous_state`/`new_state` are opaque JSON.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeRecord {
    pub owner: String,
    pub repo_name: String,
    pub action: ChangeAction,
    pub performed_at: OffsetDateTime,
    pub performed_by: Actor,
    pub previous_state: Option<String>,
    pub new_state: Option<String>,
    pub notes: Option<String>,
}

impl ChangeRecord {
    pub fn new(owner: &str, repo_name: &str, action: ChangeAction, actor: Actor) -> Self {
        Self {
            owner: owner.to_string(),
            repo_name: repo_name.to_string(),
            action,
            performed_at: now_millis(),
            performed_by: actor,
            previous_state: None,
            new_state: None,
            notes: None,
        }
    }

    pub fn with_states(
        mut self,
        before: Option<&RepositorySnapshot>,
        after: Option<&RepositorySnapshot>,
    ) -> Self {
        self.previous_state = before.and_then(|r| serde_json::to_string(r).ok());
        self.new_state = after.and_then(|r| serde_json::to_string(r).ok());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes = Some(note.into());
        self
    }
}
