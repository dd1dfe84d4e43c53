use std::time::Duration;

use rusqlite::{OptionalExtension, Transaction, params};

use super::{SqliteCache, StoreError};

const CURRENT_SCHEMA_VERSION: u32 = 1;

impl SqliteCache {
    pub fn schema_version(&self) -> Result<u32, StoreError> {
        self.current_schema_version()
    }

    pub(super) fn bootstrap(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.busy_timeout(Duration::from_secs(5))?;

        let current = self.current_schema_version()?;
        if current > CURRENT_SCHEMA_VERSION {
            return Err(StoreError::Io(format!(
                "unsupported cache schema version {current}; this binary supports up to {CURRENT_SCHEMA_VERSION}"
            )));
        }

        for version in (current + 1)..=CURRENT_SCHEMA_VERSION {
            let tx = self.conn.transaction()?;
            apply_migration(&tx, version)?;
            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![version],
            )?;
            tx.commit()?;
            tracing::debug!(version, "applied cache schema migration");
        }
        Ok(())
    }

    fn current_schema_version(&self) -> Result<u32, StoreError> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations' LIMIT 1",
                [],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Ok(0);
        }

        let version: u32 = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )?;
        Ok(version)
    }
}

fn apply_migration(tx: &Transaction<'_>, version: u32) -> Result<(), StoreError> {
    match version {
        1 => tx.execute_batch(
            "
            CREATE TABLE schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );

            CREATE TABLE repositories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                name TEXT NOT NULL,
                full_name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                stars INTEGER NOT NULL DEFAULT 0,
                forks INTEGER NOT NULL DEFAULT 0,
                is_archived INTEGER NOT NULL DEFAULT 0,
                is_fork INTEGER NOT NULL DEFAULT 0,
                is_private INTEGER NOT NULL DEFAULT 0,
                primary_language TEXT NOT NULL DEFAULT '',
                pushed_at TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT '',
                days_since_activity INTEGER NOT NULL DEFAULT 0,
                synced_at INTEGER NOT NULL,
                UNIQUE(owner, name)
            );
            CREATE INDEX idx_repositories_owner_synced ON repositories(owner, synced_at);

            CREATE TABLE marked_repos (
                owner TEXT NOT NULL,
                repo_name TEXT NOT NULL,
                marked_at INTEGER NOT NULL,
                UNIQUE(owner, repo_name)
            );

            CREATE TABLE sync_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                started_at INTEGER NOT NULL,
                completed_at INTEGER,
                status TEXT NOT NULL,
                repos_fetched INTEGER NOT NULL DEFAULT 0,
                repos_inserted INTEGER NOT NULL DEFAULT 0,
                repos_updated INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                duration_ms INTEGER
            );
            CREATE INDEX idx_sync_history_owner ON sync_history(owner, started_at);

            CREATE TABLE repo_changes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                repo_name TEXT NOT NULL,
                action TEXT NOT NULL,
                performed_at INTEGER NOT NULL,
                performed_by TEXT NOT NULL,
                previous_state TEXT,
                new_state TEXT,
                notes TEXT
            );
            ",
        )?,
        other => {
            return Err(StoreError::Io(format!(
                "no migration registered for schema version {other}"
            )));
        }
    }
    Ok(())
}
