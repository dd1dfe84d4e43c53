use reqwest::StatusCode;
use reqwest::blocking::{RequestBuilder, Response};

use super::{GithubClient, RemoteError};

const ATTEMPTS: usize = 3;
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

impl GithubClient {
    pub(super) fn with_retries<T>(
        &self,
        label: &str,
        mut f: impl FnMut() -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let mut last = None;
        for i in 0..ATTEMPTS {
            match f() {
                Ok(v) => return Ok(v),
                Err(err) if err.is_transient() => {
                    tracing::debug!(label, attempt = i + 1, error = %err, "remote call failed");
                    last = Some(err);
                    if i + 1 < ATTEMPTS {
                        std::thread::sleep(self.retry_backoff * (1u32 << i));
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Err(match last {
            Some(RemoteError::Io(msg)) => RemoteError::Io(format!("{label}: {msg}")),
            Some(other) => other,
            None => RemoteError::Io(format!("{label}: unknown error")),
        })
    }

    pub(super) fn send(&self, req: RequestBuilder, label: &str) -> Result<Response, RemoteError> {
        self.send_accepting(req, JSON_MEDIA_TYPE, label)
    }

    pub(super) fn send_accepting(
        &self,
        req: RequestBuilder,
        accept: &str,
        label: &str,
    ) -> Result<Response, RemoteError> {
        let req = req
            .header(reqwest::header::ACCEPT, accept)
            .header("X-GitHub-Api-Version", "2022-11-28");
        let req = match &self.token {
            Some(token) => req.header(reqwest::header::AUTHORIZATION, format!("Bearer {token}")),
            None => req,
        };
        req.send()
            .map_err(|err| RemoteError::Io(format!("{label}: {err}")))
    }

    /// Maps the status code onto the error taxonomy; 2xx passes through.
    pub(super) fn ensure_ok(&self, resp: Response, label: &str) -> Result<Response, RemoteError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        match status {
            StatusCode::UNAUTHORIZED => Err(RemoteError::Unauthorized),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS if is_rate_limited(&resp) => {
                Err(RemoteError::RateLimited {
                    reset_at: header_i64(&resp, "x-ratelimit-reset"),
                })
            }
            StatusCode::FORBIDDEN => Err(RemoteError::Io(format!(
                "{label}: forbidden (token lacks permission)"
            ))),
            StatusCode::NOT_FOUND => Err(RemoteError::NotFound(label.to_string())),
            other => Err(RemoteError::Io(format!("{label}: status {other}"))),
        }
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn is_rate_limited(resp: &Response) -> bool {
    resp.status() == StatusCode::TOO_MANY_REQUESTS
        || header_i64(resp, "x-ratelimit-remaining") == Some(0)
}

fn header_i64(resp: &Response, name: &str) -> Option<i64> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
