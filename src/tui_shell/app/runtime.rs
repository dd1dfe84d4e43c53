use std::io::IsTerminal;

use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use tokio::sync::mpsc;

use crate::bulk::perform_step;
use crate::export::{build_document, write_export};
use crate::refresh::{self, RefreshHandle};
use crate::remote::RepoSource;
use crate::store::{self, SharedCache};
use crate::tui::TuiRunOptions;

use super::*;

const REFRESH_QUEUE: usize = 16;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Executes [`Command`]s on the tokio runtime and reports results back over
/// `tx`. Nothing here touches UI state.
pub(in crate::tui_shell) struct Runtime {
    rt: tokio::runtime::Handle,
    owner: String,
    source: Arc<dyn RepoSource>,
    cache: SharedCache,
    classifier: Arc<dyn ArchiveClassifier>,
    export_dir: PathBuf,
    timeout: Duration,
    tx: mpsc::UnboundedSender<AppMsg>,
    refresh: Option<RefreshHandle>,
    marks_tx: Option<mpsc::UnboundedSender<BTreeSet<String>>>,
    marks_writer: Option<tokio::task::JoinHandle<()>>,
}

/// Single writer for the owner's mark set. Writes land in the order they were
/// queued; a backlog collapses to its newest set.
pub(in crate::tui_shell) fn spawn_marks_writer(
    rt: &tokio::runtime::Handle,
    cache: SharedCache,
    owner: String,
    tx: mpsc::UnboundedSender<AppMsg>,
) -> (
    mpsc::UnboundedSender<BTreeSet<String>>,
    tokio::task::JoinHandle<()>,
) {
    let (marks_tx, mut marks_rx) = mpsc::unbounded_channel::<BTreeSet<String>>();
    let join = rt.spawn(async move {
        while let Some(mut marks) = marks_rx.recv().await {
            while let Ok(newer) = marks_rx.try_recv() {
                marks = newer;
            }
            let cache = cache.clone();
            let owner = owner.clone();
            let res = tokio::task::spawn_blocking(move || {
                store::lock(&cache)
                    .and_then(|mut c| c.replace_marks(&owner, &marks))
                    .map_err(|err| err.to_string())
            })
            .await
            .unwrap_or_else(|err| Err(format!("marks task failed: {err}")));
            if let Err(err) = &res {
                tracing::warn!(error = %err, "persist marks failed");
            }
            Runtime::send(&tx, AppMsg::Persisted(res));
        }
        tracing::debug!("marks writer stopped");
    });
    (marks_tx, join)
}

impl Runtime {
    pub(in crate::tui_shell) fn execute_all(&self, cmds: Vec<Command>) {
        for cmd in cmds {
            self.execute(cmd);
        }
    }

    fn send(tx: &mpsc::UnboundedSender<AppMsg>, msg: AppMsg) {
        if tx.send(msg).is_err() {
            tracing::debug!("ui gone; dropping background result");
        }
    }

    pub(in crate::tui_shell) fn execute(&self, cmd: Command) {
        match cmd {
            Command::SyncNow => {
                if let Some(h) = &self.refresh
                    && !h.sync_now()
                {
                    tracing::debug!("sync already queued");
                }
            }

            Command::PersistMarks(marks) => {
                let queued = self
                    .marks_tx
                    .as_ref()
                    .is_some_and(|w| w.send(marks).is_ok());
                if !queued {
                    tracing::warn!("marks writer gone; update not persisted");
                }
            }

            Command::RecordChange(change) => {
                let cache = self.cache.clone();
                self.rt.spawn_blocking(move || {
                    let res = store::lock(&cache).and_then(|mut c| c.record_change(&change));
                    if let Err(err) = res {
                        tracing::warn!(error = %err, "record change failed");
                    }
                });
            }

            Command::BulkStep(step) => {
                let source = self.source.clone();
                let cache = self.cache.clone();
                let tx = self.tx.clone();
                let timeout = self.timeout;
                self.rt.spawn(async move {
                    let task_step = step.clone();
                    let task = tokio::task::spawn_blocking(move || {
                        perform_step(source.as_ref(), &cache, &task_step)
                    });
                    let result = match tokio::time::timeout(timeout, task).await {
                        Ok(Ok(res)) => res,
                        Ok(Err(err)) => Err(format!("step task failed: {err}")),
                        Err(_) => Err(format!("timed out after {}s", timeout.as_secs())),
                    };
                    Self::send(&tx, AppMsg::BulkStepDone { step, result });
                });
            }

            Command::LoadReadme { owner, name } => {
                let source = self.source.clone();
                let tx = self.tx.clone();
                self.rt.spawn_blocking(move || {
                    let full_name = crate::model::full_name(&owner, &name);
                    let result = source
                        .fetch_readme(&owner, &name)
                        .map_err(|err| err.to_string());
                    Self::send(&tx, AppMsg::Readme { full_name, result });
                });
            }

            Command::Export(marked) => {
                let owner = self.owner.clone();
                let dir = self.export_dir.clone();
                let classifier = self.classifier.clone();
                let tx = self.tx.clone();
                self.rt.spawn_blocking(move || {
                    let at = OffsetDateTime::now_utc();
                    let doc = build_document(&owner, &marked, classifier.as_ref(), at);
                    let res = write_export(&dir, &doc, at).map_err(|err| format!("{err:#}"));
                    Self::send(&tx, AppMsg::Exported(res));
                });
            }

            Command::Quit => {
                if let Some(h) = &self.refresh {
                    h.stop();
                }
            }
        }
    }

    fn shutdown(&mut self) {
        // Closing the queue lets the writer drain what is pending, then exit.
        self.marks_tx.take();
        if let Some(join) = self.marks_writer.take() {
            let res = self
                .rt
                .block_on(async { tokio::time::timeout(SHUTDOWN_GRACE, join).await });
            if res.is_err() {
                tracing::warn!("marks writer did not finish in time");
            }
        }
        if let Some(h) = self.refresh.take() {
            let res = self
                .rt
                .block_on(async { tokio::time::timeout(SHUTDOWN_GRACE, h.shutdown()).await });
            if res.is_err() {
                tracing::warn!("refresh worker did not stop in time");
            }
        }
    }
}

pub(in crate::tui_shell) fn run(opts: TuiRunOptions) -> Result<()> {
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        anyhow::bail!("TUI requires an interactive terminal (TTY)");
    }

    let tokio_rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("repo-sweep-worker")
        .build()
        .context("start async runtime")?;

    let owner = opts.refresh.owner.clone();
    let (repos, marks, last_sync) = {
        let c = store::lock(&opts.cache)?;
        (
            c.get_all(&owner)?,
            c.get_marks(&owner)?,
            c.get_last_sync_time(&owner)?,
        )
    };
    tracing::info!(owner = %owner, cached = repos.len(), marks = marks.len(), "starting tui");
    let mut app =
        App::new(&owner, opts.classifier.clone()).with_cached(repos, marks, last_sync);

    let (refresh_tx, mut refresh_rx) = mpsc::channel(REFRESH_QUEUE);
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
    let refresh = refresh::spawn(
        tokio_rt.handle(),
        opts.source.clone(),
        opts.cache.clone(),
        opts.refresh.clone(),
        refresh_tx,
    );
    let (marks_tx, marks_writer) = spawn_marks_writer(
        tokio_rt.handle(),
        opts.cache.clone(),
        owner.clone(),
        msg_tx.clone(),
    );
    let mut runtime = Runtime {
        rt: tokio_rt.handle().clone(),
        owner,
        source: opts.source,
        cache: opts.cache,
        classifier: opts.classifier,
        export_dir: opts.export_dir,
        timeout: opts.refresh.timeout,
        tx: msg_tx,
        refresh: Some(refresh),
        marks_tx: Some(marks_tx),
        marks_writer: Some(marks_writer),
    };

    let mut stdout = io::stdout();
    enable_raw_mode().context("enable raw mode")?;
    execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let res = event_loop::run_loop(
        &mut terminal,
        &mut app,
        &runtime,
        &mut refresh_rx,
        &mut msg_rx,
    );

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    runtime.shutdown();
    tokio_rt.shutdown_timeout(SHUTDOWN_GRACE);
    res
}
