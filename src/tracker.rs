//! Processed-item tracking: the sole deduplication gate. An identifier is
//! marked once an event clears every filter and is checked before the
//! filters run again, scoped per flow-step rather than globally.

use crate::error::Result;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

#[async_trait]
pub trait ProcessedItemTracker: Send + Sync {
    async fn is_processed(&self, identifier: &str, scope: &str) -> Result<bool>;
    async fn mark_processed(&self, identifier: &str, scope: &str, job_id: Option<&str>)
        -> Result<()>;
}

/// In-memory tracker for development and testing.
#[derive(Default)]
pub struct InMemoryTracker {
    seen: Mutex<HashSet<(String, String)>>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessedItemTracker for InMemoryTracker {
    async fn is_processed(&self, identifier: &str, scope: &str) -> Result<bool> {
        let seen = self.seen.lock().unwrap();
        Ok(seen.contains(&(identifier.to_string(), scope.to_string())))
    }

    async fn mark_processed(
        &self,
        identifier: &str,
        scope: &str,
        _job_id: Option<&str>,
    ) -> Result<()> {
        let mut seen = self.seen.lock().unwrap();
        seen.insert((identifier.to_string(), scope.to_string()));
        Ok(())
    }
}

/// SQLite-backed tracker. The `(identifier, scope)` primary key together
/// with `INSERT OR IGNORE` gives the idempotent insert that concurrent
/// identical invocations rely on.
pub struct SqliteTracker {
    conn: Mutex<Connection>,
}

impl SqliteTracker {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS processed_items (
                identifier    TEXT NOT NULL,
                scope         TEXT NOT NULL,
                job_id        TEXT,
                processed_at  INTEGER NOT NULL,
                PRIMARY KEY (identifier, scope)
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl ProcessedItemTracker for SqliteTracker {
    async fn is_processed(&self, identifier: &str, scope: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let hit: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM processed_items WHERE identifier = ?1 AND scope = ?2",
                params![identifier, scope],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    async fn mark_processed(
        &self,
        identifier: &str,
        scope: &str,
        job_id: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO processed_items (identifier, scope, job_id, processed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![identifier, scope, job_id, chrono::Utc::now().timestamp()],
        )?;
        debug!(identifier, scope, "Marked item processed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_tracker_scopes_identifiers() {
        let tracker = InMemoryTracker::new();
        assert!(!tracker.is_processed("abc", "step-1").await.unwrap());

        tracker.mark_processed("abc", "step-1", None).await.unwrap();
        assert!(tracker.is_processed("abc", "step-1").await.unwrap());

        // Same identifier under a different flow-step is unprocessed
        assert!(!tracker.is_processed("abc", "step-2").await.unwrap());
    }

    #[tokio::test]
    async fn sqlite_tracker_insert_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = SqliteTracker::open(dir.path().join("state.db")).unwrap();

        tracker
            .mark_processed("abc", "step-1", Some("7"))
            .await
            .unwrap();
        // Second mark is a benign no-op
        tracker
            .mark_processed("abc", "step-1", Some("8"))
            .await
            .unwrap();

        assert!(tracker.is_processed("abc", "step-1").await.unwrap());
        assert!(!tracker.is_processed("abc", "step-2").await.unwrap());
        assert!(!tracker.is_processed("def", "step-1").await.unwrap());
    }
}
