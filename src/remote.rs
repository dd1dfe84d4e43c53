//! Remote repository source. The core only sees the [`RepoSource`] trait;
//! [`GithubClient`] is the concrete implementation against the GitHub REST API.

use std::time::Duration;

use thiserror::Error;

use crate::model::RepositorySnapshot;

mod http_client;
mod repos;
mod types;

pub use self::types::GithubRepo;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("unauthorized (token missing, invalid or expired; set GITHUB_TOKEN)")]
    Unauthorized,
    #[error("rate limited by remote{}", .reset_at.map(|t| format!(" (resets at unix {t})")).unwrap_or_default())]
    RateLimited { reset_at: Option<i64> },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Io(String),
}

impl RemoteError {
    /// Only transport-level failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Io(_))
    }
}

/// Blocking operations against the remote source. Callers run these off the
/// UI thread.
pub trait RepoSource: Send + Sync {
    fn fetch_repositories(&self, owner: &str) -> Result<Vec<RepositorySnapshot>, RemoteError>;
    /// `Ok(None)` when the repository has no README.
    fn fetch_readme(&self, owner: &str, name: &str) -> Result<Option<String>, RemoteError>;
    fn archive(&self, owner: &str, name: &str) -> Result<(), RemoteError>;
    fn unarchive(&self, owner: &str, name: &str) -> Result<(), RemoteError>;
}

pub struct GithubClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::blocking::Client,
    retry_backoff: Duration,
}

impl GithubClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("repo-sweep/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| RemoteError::Io(format!("build http client: {err}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
            retry_backoff: Duration::from_millis(200),
        })
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
