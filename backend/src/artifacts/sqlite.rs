//! SQLite-backed artifact store.

use rusqlite::{params, Connection};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{timestamp, ArtifactRecord, ArtifactStats, ArtifactStore};
use crate::error::{StorageError, StorageResult};

// AUTOINCREMENT keeps ids from being reused after rows are deleted
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS artifacts (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    domain      TEXT NOT NULL,
    kind        TEXT NOT NULL,
    payload     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
";

/// Single-connection store; the mutex serializes writers.
pub struct SqliteArtifactStore {
    conn: Mutex<Connection>,
}

impl SqliteArtifactStore {
    /// Open (or create) the database at `path`. `:memory:` opens a private
    /// in-memory database.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let conn = if path.as_os_str() == ":memory:" {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            Connection::open(path)?
        };
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!(path = %path.display(), "artifact store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> StorageResult<Self> {
        Self::open(":memory:")
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl ArtifactStore for SqliteArtifactStore {
    fn append(&self, domain: &str, kind: &str, payload: &Value) -> StorageResult<i64> {
        let body = serde_json::to_string(payload)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO artifacts (domain, kind, payload, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![domain, kind, body, timestamp()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list(&self, limit: usize) -> StorageResult<Vec<ArtifactRecord>> {
        let rows = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT id, domain, kind, payload, created_at FROM artifacts ORDER BY id DESC LIMIT ?1",
            )?;
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let mapped = stmt.query_map(params![limit], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;
            mapped.collect::<Result<Vec<_>, _>>()?
        };

        rows.into_iter()
            .map(|(id, domain, kind, payload, created_at)| {
                Ok(ArtifactRecord {
                    id,
                    domain,
                    kind,
                    payload: serde_json::from_str(&payload)?,
                    created_at,
                })
            })
            .collect()
    }

    fn clear(&self) -> StorageResult<usize> {
        Ok(self.conn()?.execute("DELETE FROM artifacts", [])?)
    }

    fn stats(&self) -> StorageResult<ArtifactStats> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT domain, COUNT(*) FROM artifacts GROUP BY domain")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stats = ArtifactStats::default();
        for (domain, count) in counts {
            let count = usize::try_from(count).unwrap_or(0);
            stats.total += count;
            stats.by_domain.insert(domain, count);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_ids_strictly_increase() {
        let store = SqliteArtifactStore::in_memory().unwrap();
        let a = store.append("chat", "chat", &json!({"n": 1})).unwrap();
        let b = store.append("chat", "chat", &json!({"n": 2})).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_ids_not_reused_after_clear() {
        let store = SqliteArtifactStore::in_memory().unwrap();
        let mut last = 0;
        for i in 0..3 {
            last = store.append("d", "analysis", &json!({"i": i})).unwrap();
        }

        assert_eq!(store.clear().unwrap(), 3);
        assert!(store.list(10).unwrap().is_empty());

        let next = store.append("d", "analysis", &json!({})).unwrap();
        assert!(next > last);
    }

    #[test]
    fn test_list_descending_prefix_of_history() {
        let store = SqliteArtifactStore::in_memory().unwrap();
        for i in 0..5 {
            store.append("d", "chat", &json!({"i": i})).unwrap();
        }

        let all = store.list(100).unwrap();
        let head = store.list(3).unwrap();

        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|w| w[0].id > w[1].id));
        assert_eq!(head, all[..3].to_vec());
        assert_eq!(head[0].payload, json!({"i": 4}));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("artifacts.db");

        let first = {
            let store = SqliteArtifactStore::open(&path).unwrap();
            store.append("construction", "analysis", &json!({"ok": true})).unwrap()
        };

        let store = SqliteArtifactStore::open(&path).unwrap();
        let records = store.list(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, first);
        assert_eq!(records[0].domain, "construction");
        assert!(records[0].created_at.ends_with('Z'));
    }

    #[test]
    fn test_stats_by_domain() {
        let store = SqliteArtifactStore::in_memory().unwrap();
        store.append("a", "chat", &json!({})).unwrap();
        store.append("a", "chat", &json!({})).unwrap();
        store.append("b", "analysis", &json!({})).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_domain["a"], 2);
        assert_eq!(stats.by_domain["b"], 1);
    }
}
