#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Json;
use serde_json::{Value, json};
use tokio::sync::oneshot;

pub const RESET_AT: i64 = 1_700_000_000;

/// In-memory stand-in for the parts of the GitHub REST API the client uses.
#[derive(Default)]
pub struct FakeState {
    /// Accepted bearer token. Requests with any other token get 401.
    pub token: Option<String>,
    /// Login returned by `/user` for the accepted token.
    pub login: String,
    pub orgs: BTreeSet<String>,
    pub repos: Vec<Value>,
    pub readmes: HashMap<String, String>,
    pub rate_limited: bool,
    /// Repository names whose PATCH answers 500.
    pub failing_patches: BTreeSet<String>,
    pub hits: Vec<String>,
}

impl FakeState {
    pub fn with_token(mut self, token: &str, login: &str) -> Self {
        self.token = Some(token.to_string());
        self.login = login.to_string();
        self
    }

    pub fn with_org(mut self, org: &str) -> Self {
        self.orgs.insert(org.to_string());
        self
    }

    pub fn with_repo(mut self, repo: Value) -> Self {
        self.repos.push(repo);
        self
    }

    pub fn with_readme(mut self, full_name: &str, text: &str) -> Self {
        self.readmes.insert(full_name.to_string(), text.to_string());
        self
    }

    pub fn find(&self, owner: &str, name: &str) -> Option<&Value> {
        self.repos
            .iter()
            .find(|r| r["owner"]["login"] == owner && r["name"] == name)
    }
}

/// Repository JSON in the shape GitHub returns.
pub fn gh_repo(owner: &str, name: &str, pushed_at: &str, stars: u32) -> Value {
    json!({
        "name": name,
        "full_name": format!("{owner}/{name}"),
        "owner": { "login": owner },
        "description": format!("{name} description"),
        "stargazers_count": stars,
        "forks_count": 0,
        "language": "Rust",
        "archived": false,
        "fork": false,
        "private": false,
        "pushed_at": pushed_at,
        "created_at": "2019-06-01T00:00:00Z",
    })
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeGithub {
    pub base_url: String,
    state: Shared,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl FakeGithub {
    pub fn start(state: FakeState) -> Result<Self> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").context("bind fake github")?;
        listener
            .set_nonblocking(true)
            .context("set listener nonblocking")?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let state: Shared = Arc::new(Mutex::new(state));
        let app = router(state.clone());
        let (tx, rx) = oneshot::channel::<()>();

        let thread = thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .expect("fake github runtime");
            rt.block_on(async move {
                let listener =
                    tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = rx.await;
                    })
                    .await
                    .expect("fake github serve");
            });
        });

        Ok(Self {
            base_url,
            state,
            shutdown: Some(tx),
            thread: Some(thread),
        })
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake github state")
    }

    pub fn hits(&self) -> Vec<String> {
        self.state().hits.clone()
    }
}

impl Drop for FakeGithub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/user", get(whoami))
        .route("/user/repos", get(own_repos))
        .route("/orgs/:org/repos", get(org_repos))
        .route("/users/:user/repos", get(user_repos))
        .route("/repos/:owner/:name", axum::routing::patch(patch_repo))
        .route("/repos/:owner/:name/readme", get(readme))
        .with_state(state)
}

fn status(code: StatusCode, message: &str) -> Response {
    (code, Json(json!({ "message": message }))).into_response()
}

/// Records the hit, then resolves the caller: `Ok(Some(login))` for the
/// accepted token, `Ok(None)` when anonymous.
fn admit(
    st: &mut FakeState,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<Option<String>, Response> {
    st.hits.push(format!("{} {}", method, uri.path()));
    if st.rate_limited {
        return Err((
            StatusCode::FORBIDDEN,
            [
                ("x-ratelimit-remaining", "0".to_string()),
                ("x-ratelimit-reset", RESET_AT.to_string()),
            ],
            Json(json!({ "message": "API rate limit exceeded" })),
        )
            .into_response());
    }
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match bearer {
        None => Ok(None),
        Some(t) if st.token.as_deref() == Some(t) => Ok(Some(st.login.clone())),
        Some(_) => Err(status(StatusCode::UNAUTHORIZED, "Bad credentials")),
    }
}

fn page(st: &FakeState, owner: &str, include_private: bool, q: &HashMap<String, String>) -> Response {
    let per_page: usize = q.get("per_page").and_then(|v| v.parse().ok()).unwrap_or(30);
    let page: usize = q.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
    let all: Vec<Value> = st
        .repos
        .iter()
        .filter(|r| r["owner"]["login"] == owner)
        .filter(|r| include_private || r["private"] != true)
        .cloned()
        .collect();
    let out: Vec<Value> = all
        .into_iter()
        .skip(per_page * page.saturating_sub(1))
        .take(per_page)
        .collect();
    Json(out).into_response()
}

async fn whoami(State(s): State<Shared>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let mut st = s.lock().expect("state");
    match admit(&mut st, &method, &uri, &headers) {
        Err(resp) => resp,
        Ok(None) => status(StatusCode::UNAUTHORIZED, "Requires authentication"),
        Ok(Some(login)) => Json(json!({ "login": login })).into_response(),
    }
}

async fn own_repos(
    State(s): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let mut st = s.lock().expect("state");
    match admit(&mut st, &method, &uri, &headers) {
        Err(resp) => resp,
        Ok(None) => status(StatusCode::UNAUTHORIZED, "Requires authentication"),
        Ok(Some(login)) => page(&st, &login, true, &q),
    }
}

async fn org_repos(
    State(s): State<Shared>,
    Path(org): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let mut st = s.lock().expect("state");
    if let Err(resp) = admit(&mut st, &method, &uri, &headers) {
        return resp;
    }
    if !st.orgs.contains(&org) {
        return status(StatusCode::NOT_FOUND, "Not Found");
    }
    page(&st, &org, false, &q)
}

async fn user_repos(
    State(s): State<Shared>,
    Path(user): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let mut st = s.lock().expect("state");
    if let Err(resp) = admit(&mut st, &method, &uri, &headers) {
        return resp;
    }
    page(&st, &user, false, &q)
}

async fn readme(
    State(s): State<Shared>,
    Path((owner, name)): Path<(String, String)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let mut st = s.lock().expect("state");
    if let Err(resp) = admit(&mut st, &method, &uri, &headers) {
        return resp;
    }
    match st.readmes.get(&format!("{owner}/{name}")) {
        Some(text) => text.clone().into_response(),
        None => status(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn patch_repo(
    State(s): State<Shared>,
    Path((owner, name)): Path<(String, String)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut st = s.lock().expect("state");
    match admit(&mut st, &method, &uri, &headers) {
        Err(resp) => return resp,
        Ok(None) => return status(StatusCode::UNAUTHORIZED, "Requires authentication"),
        Ok(Some(_)) => {}
    }
    if st.failing_patches.contains(&name) {
        return status(StatusCode::INTERNAL_SERVER_ERROR, "Server Error");
    }
    let Some(archived) = body["archived"].as_bool() else {
        return status(StatusCode::UNPROCESSABLE_ENTITY, "archived must be a boolean");
    };
    let Some(repo) = st
        .repos
        .iter_mut()
        .find(|r| r["owner"]["login"] == owner.as_str() && r["name"] == name.as_str())
    else {
        return status(StatusCode::NOT_FOUND, "Not Found");
    };
    repo["archived"] = json!(archived);
    Json(repo.clone()).into_response()
}
