use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::model::RepositorySnapshot;
use crate::remote::{RemoteError, RepoSource};

pub(crate) fn repo(owner: &str, name: &str, days: i64, stars: u32) -> RepositorySnapshot {
    let mut r = RepositorySnapshot::new(owner, name);
    r.days_since_activity = days;
    r.stars = stars;
    r.pushed_at = "2024-01-01T00:00:00Z".to_string();
    r.created_at = "2020-01-01T00:00:00Z".to_string();
    r
}

/// In-memory remote. Archive calls for names in `fail_on` return an error.
#[derive(Default)]
pub(crate) struct FakeSource {
    pub(crate) repos: Mutex<Vec<RepositorySnapshot>>,
    pub(crate) fail_on: BTreeSet<String>,
    pub(crate) fetch_error: Mutex<Option<RemoteError>>,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub(crate) fn with_repos(repos: Vec<RepositorySnapshot>) -> Self {
        Self {
            repos: Mutex::new(repos),
            ..Self::default()
        }
    }

    pub(crate) fn failing(mut self, name: &str) -> Self {
        self.fail_on.insert(name.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn set_archived(&self, owner: &str, name: &str, archived: bool) -> Result<(), RemoteError> {
        let verb = if archived { "archive" } else { "unarchive" };
        self.calls.lock().unwrap().push(format!("{verb} {owner}/{name}"));
        if self.fail_on.contains(name) {
            return Err(RemoteError::Io(format!("{name}: boom")));
        }
        let mut repos = self.repos.lock().unwrap();
        match repos.iter_mut().find(|r| r.owner == owner && r.name == name) {
            Some(r) => {
                r.is_archived = archived;
                Ok(())
            }
            None => Err(RemoteError::NotFound(format!("{owner}/{name}"))),
        }
    }
}

impl RepoSource for FakeSource {
    fn fetch_repositories(&self, owner: &str) -> Result<Vec<RepositorySnapshot>, RemoteError> {
        self.calls.lock().unwrap().push(format!("fetch {owner}"));
        if let Some(err) = self.fetch_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .repos
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect())
    }

    fn fetch_readme(&self, _owner: &str, name: &str) -> Result<Option<String>, RemoteError> {
        Ok(Some(format!("# {name}\n")))
    }

    fn archive(&self, owner: &str, name: &str) -> Result<(), RemoteError> {
        self.set_archived(owner, name, true)
    }

    fn unarchive(&self, owner: &str, name: &str) -> Result<(), RemoteError> {
        self.set_archived(owner, name, false)
    }
}
