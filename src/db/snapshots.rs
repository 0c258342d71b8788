use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use crate::persistence::{SessionSnapshot, SnapshotStore};

use super::{
    helpers::{to_i64, to_u64},
    Database,
};

impl Database {
    pub async fn upsert_snapshot(&self, key: &str, value: String, updated_at_ms: i64) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO snapshots (key, value, updated_at_ms)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at_ms = excluded.updated_at_ms",
                params![key, value, updated_at_ms],
            )
            .context("failed to upsert snapshot")?;
            Ok(())
        })
        .await
    }

    pub async fn get_snapshot(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.query_row(
                "SELECT value FROM snapshots WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to read snapshot")
        })
        .await
    }

    pub async fn delete_snapshot(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM snapshots WHERE key = ?1", params![key])
                .context("failed to delete snapshot")?;
            Ok(())
        })
        .await
    }

    pub async fn count_snapshots(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
            to_u64(count, "snapshot count")
        })
        .await
    }

    /// Deletes snapshots not written within `staleness_ms` of `now_ms`.
    pub async fn purge_stale_snapshots(&self, now_ms: i64, staleness_ms: u64) -> Result<usize> {
        let cutoff = now_ms.saturating_sub(to_i64(staleness_ms)?);
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM snapshots WHERE updated_at_ms < ?1",
                params![cutoff],
            )
            .context("failed to purge stale snapshots")
        })
        .await
    }
}

impl SnapshotStore for Database {
    /// Rows are stamped with the snapshot's own `savedAtTs`, so purging
    /// follows the same clock that produced the snapshot.
    async fn write(&self, key: &str, value: String) -> Result<()> {
        let saved_at_ms = serde_json::from_str::<SessionSnapshot>(&value)
            .with_context(|| format!("value for {key} is not a session snapshot"))?
            .saved_at_ts;
        self.upsert_snapshot(key, value, saved_at_ms).await
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        self.get_snapshot(key).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.delete_snapshot(key).await
    }
}
