use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use repo_sweep::classify::{ArchiveClassifier, HeuristicClassifier};
use repo_sweep::config::{self, AppConfig};
use repo_sweep::export::{build_document, write_export};
use repo_sweep::model::{RepositorySnapshot, fmt_rfc3339};
use repo_sweep::pipeline::{self, FilterKind, SortField, ViewQuery};
use repo_sweep::refresh::{RefreshSettings, refresh_once};
use repo_sweep::remote::{GithubClient, RepoSource};
use repo_sweep::store::SqliteCache;
use repo_sweep::tui::{self, TuiRunOptions};
use repo_sweep::logging;

#[derive(Parser)]
#[command(name = "repo-sweep")]
#[command(about = "Audit GitHub repositories and archive them in bulk", long_about = None)]
struct Cli {
    /// Account or organization to audit (overrides config)
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite cache file (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal UI (default)
    Tui,

    /// Fetch repositories now and update the cache
    Sync,

    /// Print cached repositories through the view pipeline
    List {
        /// all, stale, zero-engagement, forks
        #[arg(long, default_value = "all")]
        filter: String,
        /// name, activity, stars, language
        #[arg(long, default_value = "name")]
        sort: String,
        #[arg(long)]
        desc: bool,
        /// Primary language; "(none)" selects repositories without one
        #[arg(long)]
        language: Option<String>,
        /// Case-insensitive substring of the name
        #[arg(long)]
        search: Option<String>,
        /// Include private and archived repositories
        #[arg(long)]
        all: bool,
        /// Only archive candidates
        #[arg(long)]
        candidates: bool,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the marked repositories to a JSON file
    Export {
        /// Output directory (defaults to config export_dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Show recent sync attempts
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Update values in the config file
    Set {
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        refresh_interval_secs: Option<u64>,
        #[arg(long)]
        request_timeout_secs: Option<u64>,
        #[arg(long)]
        export_dir: Option<PathBuf>,
        #[arg(long)]
        api_base_url: Option<String>,
        /// Glob for names never flagged as candidates (repeatable)
        #[arg(long = "protect")]
        protect: Vec<String>,
        #[arg(long)]
        log_level: Option<String>,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let file_cfg = config::load(&config_path)?;

    let mut cfg = file_cfg.clone();
    if let Some(owner) = &cli.owner {
        cfg.owner = Some(owner.clone());
    }
    if let Some(db) = &cli.db {
        cfg.database_path = Some(db.clone());
    }

    let command = cli.command.unwrap_or(Commands::Tui);
    match &command {
        Commands::Tui => logging::init_to_file(cfg.log_level.as_deref(), &config::log_path())?,
        _ => logging::init_stderr(cfg.log_level.as_deref())?,
    }

    match command {
        Commands::Tui => {
            let owner = cfg.require_owner()?.to_string();
            let cache = open_cache(&cfg)?.into_shared();
            tui::run_with_options(TuiRunOptions {
                cache,
                source: github_source(&cfg)?,
                classifier: classifier(&cfg)?,
                refresh: RefreshSettings {
                    owner,
                    interval: cfg.refresh_interval(),
                    timeout: cfg.request_timeout(),
                },
                export_dir: cfg.export_dir(),
            })?;
        }

        Commands::Sync => {
            let owner = cfg.require_owner()?.to_string();
            let cache = open_cache(&cfg)?.into_shared();
            let source = github_source(&cfg)?;
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("start async runtime")?;
            let report = rt.block_on(refresh_once(
                source,
                cache,
                &owner,
                cfg.request_timeout(),
            ))?;
            println!(
                "Synced {}: fetched {}, inserted {}, updated {}, evicted {}",
                owner,
                report.repos.len(),
                report.upsert.inserted,
                report.upsert.updated,
                report.evicted
            );
        }

        Commands::List {
            filter,
            sort,
            desc,
            language,
            search,
            all,
            candidates,
            json,
        } => {
            let owner = cfg.require_owner()?;
            let query = ViewQuery {
                filter: FilterKind::parse(&filter)
                    .with_context(|| format!("unknown filter {filter:?}"))?,
                language,
                search: search.unwrap_or_default(),
                show_private: all,
                show_archived: all,
                sort_field: SortField::parse(&sort)
                    .with_context(|| format!("unknown sort field {sort:?}"))?,
                sort_ascending: !desc,
            };
            let cache = open_cache(&cfg)?;
            let marks = cache.get_marks(owner)?;
            let classifier = classifier(&cfg)?;
            let rows: Vec<RepositorySnapshot> = pipeline::render(&cache.get_all(owner)?, &query)
                .into_iter()
                .map(|mut r| {
                    r.marked = marks.contains(&r.full_name);
                    let v = classifier.classify(&r);
                    r.reason = v.is_candidate.then_some(v.reason);
                    r
                })
                .filter(|r| !candidates || r.reason.is_some())
                .collect();

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&rows).context("serialize repositories json")?
                );
            } else {
                for r in &rows {
                    println!(
                        "{} {:<40} {:>5}* {:>5}d {:<12} {}",
                        if r.marked { "x" } else { " " },
                        r.name,
                        r.stars,
                        r.days_since_activity,
                        r.language_label(),
                        r.reason.as_deref().unwrap_or("")
                    );
                }
            }
        }

        Commands::Export { dir } => {
            let owner = cfg.require_owner()?;
            let cache = open_cache(&cfg)?;
            let marks = cache.get_marks(owner)?;
            let marked: Vec<RepositorySnapshot> = cache
                .get_all(owner)?
                .into_iter()
                .filter(|r| marks.contains(&r.full_name))
                .collect();
            if marked.is_empty() {
                anyhow::bail!("no marked repositories for {owner}");
            }
            let at = time::OffsetDateTime::now_utc();
            let doc = build_document(owner, &marked, classifier(&cfg)?.as_ref(), at);
            let path = write_export(&dir.unwrap_or_else(|| cfg.export_dir()), &doc, at)?;
            println!("Exported {} repositories to {}", doc.total_marked, path.display());
        }

        Commands::History { limit, json } => {
            let owner = cfg.require_owner()?;
            let cache = open_cache(&cfg)?;
            let history = cache.list_sync_history(owner, limit)?;
            if json {
                let rows: Vec<serde_json::Value> = history
                    .iter()
                    .map(|h| {
                        serde_json::json!({
                            "id": h.id,
                            "owner": h.owner,
                            "started_at": fmt_rfc3339(h.started_at),
                            "completed_at": h.completed_at.map(fmt_rfc3339),
                            "status": h.status.as_str(),
                            "repos_fetched": h.repos_fetched,
                            "repos_inserted": h.repos_inserted,
                            "repos_updated": h.repos_updated,
                            "error_message": h.error_message,
                            "duration_ms": h.duration_ms,
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&rows).context("serialize history json")?
                );
            } else if history.is_empty() {
                println!("No syncs recorded for {}", owner);
            } else {
                for h in history {
                    println!(
                        "{} {:<8} fetched={} inserted={} updated={} {}{}",
                        fmt_rfc3339(h.started_at),
                        h.status.as_str(),
                        h.repos_fetched,
                        h.repos_inserted,
                        h.repos_updated,
                        h.duration_ms
                            .map(|d| format!("{}ms", d))
                            .unwrap_or_default(),
                        h.error_message
                            .map(|e| format!(" error: {}", e))
                            .unwrap_or_default()
                    );
                }
            }
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show { json } => {
                if json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&cfg).context("serialize config json")?
                    );
                } else {
                    println!("config: {}", config_path.display());
                    println!("owner: {}", cfg.owner.as_deref().unwrap_or("(unset)"));
                    println!("database: {}", cfg.database_path().display());
                    println!("export_dir: {}", cfg.export_dir().display());
                    println!("api_base_url: {}", cfg.api_base_url);
                    println!("refresh_interval_secs: {}", cfg.refresh_interval_secs);
                    println!("request_timeout_secs: {}", cfg.request_timeout_secs);
                    if !cfg.protected.is_empty() {
                        println!("protected: {}", cfg.protected.join(", "));
                    }
                    println!(
                        "token: {}",
                        if config::token_from_env().is_some() {
                            "from environment"
                        } else {
                            "(none; set GITHUB_TOKEN)"
                        }
                    );
                }
            }
            ConfigCommands::Set {
                owner,
                refresh_interval_secs,
                request_timeout_secs,
                export_dir,
                api_base_url,
                protect,
                log_level,
            } => {
                let mut next = file_cfg;
                if let Some(v) = owner.or(cli.owner) {
                    next.owner = Some(v);
                }
                if let Some(v) = refresh_interval_secs {
                    next.refresh_interval_secs = v;
                }
                if let Some(v) = request_timeout_secs {
                    next.request_timeout_secs = v;
                }
                if let Some(v) = export_dir {
                    next.export_dir = Some(v);
                }
                if let Some(v) = api_base_url {
                    next.api_base_url = v;
                }
                if let Some(v) = cli.db {
                    next.database_path = Some(v);
                }
                if !protect.is_empty() {
                    next.protected = protect;
                }
                if let Some(v) = log_level {
                    next.log_level = Some(v);
                }
                HeuristicClassifier::with_protected(&next.protected)?;
                config::save(&config_path, &next)?;
                println!("Saved {}", config_path.display());
            }
        },
    }

    Ok(())
}

fn open_cache(cfg: &AppConfig) -> Result<SqliteCache> {
    let path = cfg.database_path();
    SqliteCache::open(&path).with_context(|| format!("open cache {}", path.display()))
}

fn github_source(cfg: &AppConfig) -> Result<Arc<dyn RepoSource>> {
    let client = GithubClient::new(
        &cfg.api_base_url,
        config::token_from_env(),
        cfg.request_timeout(),
    )?;
    Ok(Arc::new(client))
}

fn classifier(cfg: &AppConfig) -> Result<Arc<dyn ArchiveClassifier>> {
    Ok(Arc::new(HeuristicClassifier::with_protected(&cfg.protected)?))
}
