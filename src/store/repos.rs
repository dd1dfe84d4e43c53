use rusqlite::{OptionalExtension, Row, params};
use time::OffsetDateTime;

use crate::model::{RepositorySnapshot, from_unix_millis, now_millis, to_unix_millis};

use super::{SqliteCache, StoreError};

/// Result of one batch upsert. Every row in the batch carries `synced_at`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpsertReport {
    pub synced_at: OffsetDateTime,
    pub inserted: u64,
    pub updated: u64,
}

const SELECT_COLUMNS: &str = "owner, name, full_name, description, stars, forks, is_archived, is_fork, is_private, primary_language, pushed_at, created_at, days_since_activity";

impl SqliteCache {
    /// Replaces or inserts every snapshot in one transaction, stamped with the
    /// current time. Either all rows land or none do.
    pub fn upsert_all(
        &mut self,
        owner: &str,
        repos: &[RepositorySnapshot],
    ) -> Result<UpsertReport, StoreError> {
        self.upsert_all_at(owner, repos, now_millis())
    }

    pub fn upsert_all_at(
        &mut self,
        owner: &str,
        repos: &[RepositorySnapshot],
        synced_at: OffsetDateTime,
    ) -> Result<UpsertReport, StoreError> {
        let synced_ms = to_unix_millis(synced_at);
        let tx = self.conn.transaction()?;
        let mut report = UpsertReport {
            synced_at,
            inserted: 0,
            updated: 0,
        };

        {
            let mut exists = tx.prepare(
                "SELECT 1 FROM repositories WHERE owner = ?1 AND name = ?2 LIMIT 1",
            )?;
            let mut upsert = tx.prepare(
                "
                INSERT INTO repositories (
                    owner, name, full_name, description, stars, forks, is_archived, is_fork,
                    is_private, primary_language, pushed_at, created_at, days_since_activity, synced_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                ON CONFLICT(owner, name) DO UPDATE SET
                    full_name = excluded.full_name,
                    description = excluded.description,
                    stars = excluded.stars,
                    forks = excluded.forks,
                    is_archived = excluded.is_archived,
                    is_fork = excluded.is_fork,
                    is_private = excluded.is_private,
                    primary_language = excluded.primary_language,
                    pushed_at = excluded.pushed_at,
                    created_at = excluded.created_at,
                    days_since_activity = excluded.days_since_activity,
                    synced_at = excluded.synced_at
                ",
            )?;

            for repo in repos {
                if repo.owner != owner {
                    // Returning drops `tx` uncommitted, which rolls back the batch.
                    return Err(StoreError::Io(format!(
                        "snapshot {} does not belong to owner {}",
                        repo.full_name, owner
                    )));
                }
                let existed = exists
                    .query_row(params![repo.owner, repo.name], |_| Ok(()))
                    .optional()?
                    .is_some();
                upsert.execute(params![
                    repo.owner,
                    repo.name,
                    repo.full_name,
                    repo.description,
                    repo.stars,
                    repo.forks,
                    repo.is_archived,
                    repo.is_fork,
                    repo.is_private,
                    repo.language,
                    repo.pushed_at,
                    repo.created_at,
                    repo.days_since_activity,
                    synced_ms,
                ])?;
                if existed {
                    report.updated += 1;
                } else {
                    report.inserted += 1;
                }
            }
        }

        tx.commit()?;
        Ok(report)
    }

    /// All cached snapshots for `owner`, ordered by name.
    pub fn get_all(&self, owner: &str) -> Result<Vec<RepositorySnapshot>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM repositories WHERE owner = ?1 ORDER BY name ASC"
        ))?;
        let rows = stmt.query_map(params![owner], map_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_repo(&self, owner: &str, name: &str) -> Result<RepositorySnapshot, StoreError> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM repositories WHERE owner = ?1 AND name = ?2"
                ),
                params![owner, name],
                map_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("{owner}/{name}")))
    }

    /// Latest `synced_at` across the owner's snapshots; `None` if nothing has
    /// ever synced.
    pub fn get_last_sync_time(&self, owner: &str) -> Result<Option<OffsetDateTime>, StoreError> {
        let ms: Option<i64> = self.conn.query_row(
            "SELECT MAX(synced_at) FROM repositories WHERE owner = ?1",
            params![owner],
            |row| row.get(0),
        )?;
        Ok(ms.and_then(from_unix_millis))
    }

    /// Evicts snapshots not refreshed since `cutoff`. Returns the number removed.
    pub fn delete_older_than(
        &mut self,
        owner: &str,
        cutoff: OffsetDateTime,
    ) -> Result<usize, StoreError> {
        let n = self.conn.execute(
            "DELETE FROM repositories WHERE owner = ?1 AND synced_at < ?2",
            params![owner, to_unix_millis(cutoff)],
        )?;
        Ok(n)
    }

    pub fn set_archived(
        &mut self,
        owner: &str,
        name: &str,
        archived: bool,
    ) -> Result<(), StoreError> {
        let n = self.conn.execute(
            "UPDATE repositories SET is_archived = ?3 WHERE owner = ?1 AND name = ?2",
            params![owner, name, archived],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound(format!("{owner}/{name}")));
        }
        Ok(())
    }

    pub fn count(&self, owner: &str) -> Result<u64, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM repositories WHERE owner = ?1",
            params![owner],
            |row| row.get(0),
        )?;
        Ok(n.max(0) as u64)
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<RepositorySnapshot> {
    Ok(RepositorySnapshot {
        owner: row.get(0)?,
        name: row.get(1)?,
        full_name: row.get(2)?,
        description: row.get(3)?,
        stars: row.get(4)?,
        forks: row.get(5)?,
        is_archived: row.get(6)?,
        is_fork: row.get(7)?,
        is_private: row.get(8)?,
        language: row.get(9)?,
        pushed_at: row.get(10)?,
        created_at: row.get(11)?,
        days_since_activity: row.get(12)?,
        marked: false,
        reason: None,
    })
}
