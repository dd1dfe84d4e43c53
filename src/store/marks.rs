use std::collections::BTreeSet;

use rusqlite::params;

use crate::model::{full_name, now_millis, to_unix_millis};

use super::{SqliteCache, StoreError};

// Marks are keyed by full name at the API; the table stores the short name
// under its owner.
fn repo_name<'a>(owner: &str, full: &'a str) -> &'a str {
    full.strip_prefix(owner)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(full)
}

impl SqliteCache {
    pub fn get_marks(&self, owner: &str) -> Result<BTreeSet<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT repo_name FROM marked_repos WHERE owner = ?1")?;
        let rows = stmt.query_map(params![owner], |row| row.get::<_, String>(0))?;
        let mut out = BTreeSet::new();
        for name in rows {
            out.insert(full_name(owner, &name?));
        }
        Ok(out)
    }

    /// Adding an existing mark is a no-op.
    pub fn add_mark(&mut self, owner: &str, full: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO marked_repos (owner, repo_name, marked_at) VALUES (?1, ?2, ?3)",
            params![owner, repo_name(owner, full), to_unix_millis(now_millis())],
        )?;
        Ok(())
    }

    /// Removing a missing mark is a no-op.
    pub fn remove_mark(&mut self, owner: &str, full: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM marked_repos WHERE owner = ?1 AND repo_name = ?2",
            params![owner, repo_name(owner, full)],
        )?;
        Ok(())
    }

    /// Replaces the owner's whole mark set in one transaction. Existing marks
    /// that survive keep their original `marked_at`.
    pub fn replace_marks(
        &mut self,
        owner: &str,
        marks: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        let now = to_unix_millis(now_millis());
        let tx = self.conn.transaction()?;
        {
            let existing = {
                let mut stmt = tx.prepare("SELECT repo_name FROM marked_repos WHERE owner = ?1")?;
                let rows = stmt.query_map(params![owner], |row| row.get::<_, String>(0))?;
                rows.collect::<Result<BTreeSet<_>, _>>()?
            };
            let wanted: BTreeSet<&str> = marks.iter().map(|m| repo_name(owner, m)).collect();

            let mut delete =
                tx.prepare("DELETE FROM marked_repos WHERE owner = ?1 AND repo_name = ?2")?;
            for name in existing.iter().filter(|n| !wanted.contains(n.as_str())) {
                delete.execute(params![owner, name])?;
            }

            let mut insert = tx.prepare(
                "INSERT OR IGNORE INTO marked_repos (owner, repo_name, marked_at) VALUES (?1, ?2, ?3)",
            )?;
            for name in wanted {
                insert.execute(params![owner, name, now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn clear_marks(&mut self, owner: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM marked_repos WHERE owner = ?1",
            params![owner],
        )?;
        Ok(())
    }
}
