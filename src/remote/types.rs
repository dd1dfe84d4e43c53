//! Wire types for the GitHub REST API.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::model::{RepositorySnapshot, days_since, full_name};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GithubOwner {
    pub login: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GithubRepo {
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub owner: GithubOwner,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub pushed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl GithubRepo {
    /// A repository that was never pushed to counts its age from creation.
    pub fn into_snapshot(self, now: OffsetDateTime) -> RepositorySnapshot {
        let created_at = self.created_at.unwrap_or_default();
        let pushed_at = self
            .pushed_at
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| created_at.clone());
        let owner = self.owner.login;
        let full = self
            .full_name
            .unwrap_or_else(|| full_name(&owner, &self.name));
        RepositorySnapshot {
            days_since_activity: days_since(&pushed_at, now),
            full_name: full,
            description: self.description.unwrap_or_default(),
            stars: self.stargazers_count,
            forks: self.forks_count,
            language: self.language.unwrap_or_default(),
            is_archived: self.archived,
            is_fork: self.fork,
            is_private: self.private,
            pushed_at,
            created_at,
            name: self.name,
            owner,
            marked: false,
            reason: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AuthenticatedUser {
    pub(super) login: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ArchiveRequest {
    pub(super) archived: bool,
}
