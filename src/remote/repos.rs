use time::OffsetDateTime;

use crate::model::{RepositorySnapshot, full_name};

use super::types::{ArchiveRequest, AuthenticatedUser, GithubRepo};
use super::{GithubClient, RemoteError, RepoSource};

const PER_PAGE: usize = 100;
const MAX_PAGES: usize = 100;
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

impl GithubClient {
    fn authenticated_login(&self) -> Result<Option<String>, RemoteError> {
        if self.token.is_none() {
            return Ok(None);
        }
        self.with_retries("whoami", || {
            let resp = self.send(self.client.get(self.url("/user")), "whoami")?;
            let user: AuthenticatedUser = self
                .ensure_ok(resp, "whoami")?
                .json()
                .map_err(|err| RemoteError::Io(format!("parse whoami: {err}")))?;
            Ok(Some(user.login))
        })
    }

    fn list_page(&self, path: &str, page: usize) -> Result<Vec<GithubRepo>, RemoteError> {
        let sep = if path.contains('?') { '&' } else { '?' };
        let url = self.url(&format!("{path}{sep}per_page={PER_PAGE}&page={page}"));
        self.with_retries("list repositories", || {
            let resp = self.send(self.client.get(&url), "list repositories")?;
            self.ensure_ok(resp, "list repositories")?
                .json()
                .map_err(|err| RemoteError::Io(format!("parse repositories: {err}")))
        })
    }

    fn list_all(&self, path: &str) -> Result<Vec<GithubRepo>, RemoteError> {
        let mut out = Vec::new();
        for page in 1..=MAX_PAGES {
            let batch = self.list_page(path, page)?;
            let done = batch.len() < PER_PAGE;
            out.extend(batch);
            if done {
                break;
            }
        }
        Ok(out)
    }

    fn set_archived(&self, owner: &str, name: &str, archived: bool) -> Result<(), RemoteError> {
        let label = if archived { "archive" } else { "unarchive" };
        let url = self.url(&format!("/repos/{owner}/{name}"));
        self.with_retries(label, || {
            let resp = self.send(
                self.client.patch(&url).json(&ArchiveRequest { archived }),
                label,
            )?;
            self.ensure_ok(resp, &format!("{owner}/{name}"))?;
            Ok(())
        })
    }
}

impl RepoSource for GithubClient {
    fn fetch_repositories(&self, owner: &str) -> Result<Vec<RepositorySnapshot>, RemoteError> {
        let own = self
            .authenticated_login()?
            .is_some_and(|login| login.eq_ignore_ascii_case(owner));

        let repos = if own {
            self.list_all("/user/repos?affiliation=owner")?
        } else {
            match self.list_all(&format!("/orgs/{owner}/repos?type=all")) {
                Err(RemoteError::NotFound(_)) => {
                    self.list_all(&format!("/users/{owner}/repos?type=owner"))?
                }
                other => other?,
            }
        };

        let now = OffsetDateTime::now_utc();
        let out: Vec<RepositorySnapshot> = repos
            .into_iter()
            .filter(|r| r.owner.login.eq_ignore_ascii_case(owner))
            .map(|r| {
                // Store calls key on the configured spelling, not the login's.
                let mut snap = r.into_snapshot(now);
                snap.full_name = full_name(owner, &snap.name);
                snap.owner = owner.to_string();
                snap
            })
            .collect();
        tracing::debug!(owner, count = out.len(), "fetched repositories");
        Ok(out)
    }

    fn fetch_readme(&self, owner: &str, name: &str) -> Result<Option<String>, RemoteError> {
        let url = self.url(&format!("/repos/{owner}/{name}/readme"));
        let res = self.with_retries("readme", || {
            let resp = self.send_accepting(self.client.get(&url), RAW_MEDIA_TYPE, "readme")?;
            self.ensure_ok(resp, "readme")?
                .text()
                .map_err(|err| RemoteError::Io(format!("read readme: {err}")))
        });
        match res {
            Ok(text) => Ok(Some(text)),
            Err(RemoteError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn archive(&self, owner: &str, name: &str) -> Result<(), RemoteError> {
        self.set_archived(owner, name, true)
    }

    fn unarchive(&self, owner: &str, name: &str) -> Result<(), RemoteError> {
        self.set_archived(owner, name, false)
    }
}
