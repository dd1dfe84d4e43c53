//! Background refresh worker.
//!
//! One tokio task alternates between waiting (interval tick, sync-now trigger
//! or stop) and running [`refresh_once`]. Lifecycle messages go out on a
//! bounded channel; every send races the stop signal so shutdown never waits
//! on a consumer that stopped reading.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use time::OffsetDateTime;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::model::{
    Actor, ChangeAction, ChangeRecord, RepositorySnapshot, SyncOutcome, SyncStatus, now_millis,
};
use crate::remote::RepoSource;
use crate::store::{self, SharedCache, SqliteCache, UpsertReport};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshMsg {
    Started,
    /// Fresh rows for the owner, stamped with the batch's shared sync time.
    Completed {
        repos: Vec<RepositorySnapshot>,
        synced_at: OffsetDateTime,
    },
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct RefreshSettings {
    pub owner: String,
    pub interval: Duration,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct RefreshReport {
    pub sync_id: i64,
    pub repos: Vec<RepositorySnapshot>,
    pub upsert: UpsertReport,
    pub evicted: usize,
}

/// True when nothing was ever synced or the last sync is at least one interval
/// old.
pub fn should_refresh_now(
    last: Option<OffsetDateTime>,
    interval: Duration,
    now: OffsetDateTime,
) -> bool {
    match last {
        None => true,
        Some(last) => (now - last) >= interval,
    }
}

fn initial_delay(last: Option<OffsetDateTime>, interval: Duration, now: OffsetDateTime) -> Duration {
    match last {
        Some(last) if !should_refresh_now(Some(last), interval, now) => {
            let elapsed = Duration::try_from(now - last).unwrap_or_default();
            interval.saturating_sub(elapsed)
        }
        _ => Duration::ZERO,
    }
}

async fn with_cache<T, F>(cache: &SharedCache, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut SqliteCache) -> Result<T> + Send + 'static,
{
    let cache = cache.clone();
    tokio::task::spawn_blocking(move || {
        let mut guard = store::lock(&cache)?;
        f(&mut guard)
    })
    .await
    .context("cache task panicked")?
}

async fn fetch(
    source: Arc<dyn RepoSource>,
    owner: String,
    timeout: Duration,
) -> Result<Vec<RepositorySnapshot>> {
    let task = tokio::task::spawn_blocking(move || source.fetch_repositories(&owner));
    match tokio::time::timeout(timeout, task).await {
        Err(_) => Err(anyhow!("fetch timed out after {}s", timeout.as_secs_f32())),
        Ok(joined) => Ok(joined.context("fetch task panicked")??),
    }
}

/// One audited fetch-and-cache cycle. On failure the snapshot rows are left
/// as they were and the sync row is closed with the error.
pub async fn refresh_once(
    source: Arc<dyn RepoSource>,
    cache: SharedCache,
    owner: &str,
    timeout: Duration,
) -> Result<RefreshReport> {
    let started = now_millis();
    let sync_id = {
        let owner = owner.to_string();
        with_cache(&cache, move |c| Ok(c.start_sync(&owner, started)?)).await?
    };
    tracing::info!(owner, sync_id, "refresh started");

    let result = match fetch(source, owner.to_string(), timeout).await {
        Ok(repos) => persist(&cache, owner, sync_id, repos).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(report) => {
            tracing::info!(
                owner,
                fetched = report.repos.len(),
                inserted = report.upsert.inserted,
                updated = report.upsert.updated,
                evicted = report.evicted,
                "refresh completed"
            );
            Ok(report)
        }
        Err(err) => {
            let message = format!("{err:#}");
            tracing::warn!(owner, error = %message, "refresh failed");
            let outcome = SyncOutcome {
                status: SyncStatus::Error,
                completed_at: now_millis(),
                repos_fetched: 0,
                repos_inserted: 0,
                repos_updated: 0,
                error_message: Some(message),
            };
            if let Err(close_err) =
                with_cache(&cache, move |c| Ok(c.finish_sync(sync_id, &outcome)?)).await
            {
                tracing::warn!(sync_id, error = %close_err, "could not close failed sync record");
            }
            Err(err)
        }
    }
}

async fn persist(
    cache: &SharedCache,
    owner: &str,
    sync_id: i64,
    repos: Vec<RepositorySnapshot>,
) -> Result<RefreshReport> {
    let owner = owner.to_string();
    with_cache(cache, move |c| {
        let upsert = c.upsert_all(&owner, &repos).context("store fetched repositories")?;
        let evicted = c
            .delete_older_than(&owner, upsert.synced_at)
            .context("evict stale repositories")?;
        c.finish_sync(
            sync_id,
            &SyncOutcome {
                status: SyncStatus::Success,
                completed_at: now_millis(),
                repos_fetched: repos.len() as u64,
                repos_inserted: upsert.inserted,
                repos_updated: upsert.updated,
                error_message: None,
            },
        )?;
        let note = format!(
            "fetched {}, inserted {}, updated {}, evicted {}",
            repos.len(),
            upsert.inserted,
            upsert.updated,
            evicted
        );
        c.record_change(
            &ChangeRecord::new(&owner, "*", ChangeAction::Synced, Actor::Sync).with_note(note),
        )?;
        let repos = c.get_all(&owner)?;
        Ok(RefreshReport {
            sync_id,
            repos,
            upsert,
            evicted,
        })
    })
    .await
}

/// Handle to a running worker.
pub struct RefreshHandle {
    trigger: mpsc::Sender<()>,
    stop: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl RefreshHandle {
    /// Requests an immediate refresh. Returns false when one is already queued.
    pub fn sync_now(&self) -> bool {
        self.trigger.try_send(()).is_ok()
    }

    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signals stop and waits for the task to exit.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(err) = self.join.await {
            tracing::warn!(error = %err, "refresh worker ended abnormally");
        }
    }
}

pub fn spawn(
    rt: &Handle,
    source: Arc<dyn RepoSource>,
    cache: SharedCache,
    settings: RefreshSettings,
    tx: mpsc::Sender<RefreshMsg>,
) -> RefreshHandle {
    let (trigger_tx, trigger_rx) = mpsc::channel(1);
    let (stop_tx, stop_rx) = watch::channel(false);
    let join = rt.spawn(run(source, cache, settings, tx, trigger_rx, stop_rx));
    RefreshHandle {
        trigger: trigger_tx,
        stop: stop_tx,
        join,
    }
}

async fn run(
    source: Arc<dyn RepoSource>,
    cache: SharedCache,
    settings: RefreshSettings,
    tx: mpsc::Sender<RefreshMsg>,
    mut trigger: mpsc::Receiver<()>,
    mut stop: watch::Receiver<bool>,
) {
    let last = {
        let owner = settings.owner.clone();
        with_cache(&cache, move |c| Ok(c.get_last_sync_time(&owner)?)).await
    };
    let last = last.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "could not read last sync time");
        None
    });
    let delay = initial_delay(last, settings.interval, OffsetDateTime::now_utc());
    tracing::debug!(owner = %settings.owner, delay_secs = delay.as_secs(), "refresh worker started");

    let mut ticker = tokio::time::interval_at(Instant::now() + delay, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *stop.borrow() {
            break;
        }
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            Some(()) = trigger.recv() => {}
            _ = ticker.tick() => {}
        }
        if *stop.borrow() {
            break;
        }

        if !emit(&tx, &mut stop, RefreshMsg::Started).await {
            break;
        }
        let msg = match refresh_once(
            source.clone(),
            cache.clone(),
            &settings.owner,
            settings.timeout,
        )
        .await
        {
            Ok(report) => RefreshMsg::Completed {
                repos: report.repos,
                synced_at: report.upsert.synced_at,
            },
            Err(err) => RefreshMsg::Failed(format!("{err:#}")),
        };
        if !emit(&tx, &mut stop, msg).await {
            break;
        }
        ticker.reset();
    }
    tracing::debug!(owner = %settings.owner, "refresh worker stopped");
}

/// False when stop won the race or the consumer is gone.
async fn emit(
    tx: &mpsc::Sender<RefreshMsg>,
    stop: &mut watch::Receiver<bool>,
    msg: RefreshMsg,
) -> bool {
    if *stop.borrow() {
        return false;
    }
    tokio::select! {
        biased;
        _ = stop.changed() => false,
        sent = tx.send(msg) => sent.is_ok(),
    }
}

#[cfg(test)]
#[path = "tests/refresh_tests.rs"]
mod tests;
