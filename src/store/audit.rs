use rusqlite::{OptionalExtension, Row, params};
use time::OffsetDateTime;

use crate::model::{
    ChangeRecord, SyncOutcome, SyncRecord, SyncStatus, from_unix_millis, to_unix_millis,
};

use super::{SqliteCache, StoreError};

const SYNC_COLUMNS: &str = "id, owner, started_at, completed_at, status, repos_fetched, repos_inserted, repos_updated, error_message, duration_ms";

impl SqliteCache {
    /// Opens a `running` sync row and returns its id.
    pub fn start_sync(&mut self, owner: &str, started_at: OffsetDateTime) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO sync_history (owner, started_at, status) VALUES (?1, ?2, ?3)",
            params![owner, to_unix_millis(started_at), SyncStatus::Running.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn finish_sync(&mut self, id: i64, outcome: &SyncOutcome) -> Result<(), StoreError> {
        let completed_ms = to_unix_millis(outcome.completed_at);
        let n = self.conn.execute(
            "
            UPDATE sync_history
            SET completed_at = ?2,
                status = ?3,
                repos_fetched = ?4,
                repos_inserted = ?5,
                repos_updated = ?6,
                error_message = ?7,
                duration_ms = MAX(0, ?2 - started_at)
            WHERE id = ?1
            ",
            params![
                id,
                completed_ms,
                outcome.status.as_str(),
                outcome.repos_fetched as i64,
                outcome.repos_inserted as i64,
                outcome.repos_updated as i64,
                outcome.error_message,
            ],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound(format!("sync record {id}")));
        }
        Ok(())
    }

    /// Most recent first.
    pub fn list_sync_history(
        &self,
        owner: &str,
        limit: usize,
    ) -> Result<Vec<SyncRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SYNC_COLUMNS} FROM sync_history WHERE owner = ?1 ORDER BY started_at DESC, id DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![owner, limit as i64], map_sync_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn last_successful_sync(&self, owner: &str) -> Result<Option<SyncRecord>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {SYNC_COLUMNS} FROM sync_history WHERE owner = ?1 AND status = ?2 ORDER BY started_at DESC, id DESC LIMIT 1"
                ),
                params![owner, SyncStatus::Success.as_str()],
                map_sync_row,
            )
            .optional()?)
    }

    pub fn record_change(&mut self, change: &ChangeRecord) -> Result<i64, StoreError> {
        self.conn.execute(
            "
            INSERT INTO repo_changes (
                owner, repo_name, action, performed_at, performed_by, previous_state, new_state, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                change.owner,
                change.repo_name,
                change.action.as_str(),
                to_unix_millis(change.performed_at),
                change.performed_by.as_str(),
                change.previous_state,
                change.new_state,
                change.notes,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn count_changes(&self, owner: &str, action: &str) -> Result<u64, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM repo_changes WHERE owner = ?1 AND action = ?2",
            params![owner, action],
            |row| row.get(0),
        )?;
        Ok(n.max(0) as u64)
    }
}

fn map_sync_row(row: &Row<'_>) -> rusqlite::Result<SyncRecord> {
    let started_ms: i64 = row.get(2)?;
    let completed_ms: Option<i64> = row.get(3)?;
    let status: String = row.get(4)?;
    let fetched: i64 = row.get(5)?;
    let inserted: i64 = row.get(6)?;
    let updated: i64 = row.get(7)?;
    Ok(SyncRecord {
        id: row.get(0)?,
        owner: row.get(1)?,
        started_at: from_unix_millis(started_ms).unwrap_or(OffsetDateTime::UNIX_EPOCH),
        completed_at: completed_ms.and_then(from_unix_millis),
        status: SyncStatus::parse(&status).unwrap_or(SyncStatus::Error),
        repos_fetched: fetched.max(0) as u64,
        repos_inserted: inserted.max(0) as u64,
        repos_updated: updated.max(0) as u64,
        error_message: row.get(8)?,
        duration_ms: row.get(9)?,
    })
}
