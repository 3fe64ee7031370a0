use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{domain::Cid, protocol::ChannelSnapshot};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredChannel {
    pub snapshot: ChannelSnapshot,
    pub fingerprint: String,
    pub last_known_active_watcher: Option<DateTime<Utc>>,
    pub stored_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // Every in-memory connection is its own database; keep exactly one.
        let in_memory = is_in_memory(database_url);
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .min_connections(if in_memory { 1 } else { 0 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open channel cache at '{database_url}'"))?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn upsert_channel(
        &self,
        snapshot: &ChannelSnapshot,
        fingerprint: &str,
        last_known_active_watcher: Option<DateTime<Utc>>,
        stored_at: DateTime<Utc>,
    ) -> Result<()> {
        let cid = snapshot.cid().to_string();
        let payload = serde_json::to_string(snapshot)
            .with_context(|| format!("failed to encode snapshot for {cid}"))?;
        sqlx::query(
            "INSERT INTO channel_records
                (cid, fingerprint, snapshot, last_known_active_watcher, stored_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(cid) DO UPDATE SET
                fingerprint=excluded.fingerprint,
                snapshot=excluded.snapshot,
                last_known_active_watcher=excluded.last_known_active_watcher,
                stored_at=excluded.stored_at",
        )
        .bind(&cid)
        .bind(fingerprint)
        .bind(payload)
        .bind(last_known_active_watcher)
        .bind(stored_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to store channel record for {cid}"))?;
        Ok(())
    }

    pub async fn load_channel(&self, cid: &Cid) -> Result<Option<StoredChannel>> {
        let row = sqlx::query(
            "SELECT fingerprint, snapshot, last_known_active_watcher, stored_at
             FROM channel_records WHERE cid = ?",
        )
        .bind(cid.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload: String = row.try_get("snapshot")?;
        let snapshot = serde_json::from_str(&payload)
            .with_context(|| format!("corrupt channel record for {cid}"))?;
        Ok(Some(StoredChannel {
            snapshot,
            fingerprint: row.try_get("fingerprint")?,
            last_known_active_watcher: row.try_get("last_known_active_watcher")?,
            stored_at: row.try_get("stored_at")?,
        }))
    }

    pub async fn delete_channel(&self, cid: &Cid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM channel_records WHERE cid = ?")
            .bind(cid.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replaces the ordered channel list stored for `signature`.
    pub async fn upsert_query(&self, signature: &str, cids: &[Cid]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO channel_queries (signature, updated_at) VALUES (?, ?)
             ON CONFLICT(signature) DO UPDATE SET updated_at=excluded.updated_at",
        )
        .bind(signature)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM channel_query_entries WHERE signature = ?")
            .bind(signature)
            .execute(&mut *tx)
            .await?;
        for (position, cid) in cids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO channel_query_entries (signature, position, cid) VALUES (?, ?, ?)",
            )
            .bind(signature)
            .bind(position as i64)
            .bind(cid.to_string())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit()
            .await
            .with_context(|| format!("failed to store query {signature}"))?;
        Ok(())
    }

    pub async fn load_query(&self, signature: &str) -> Result<Option<Vec<Cid>>> {
        let known: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM channel_queries WHERE signature = ?")
                .bind(signature)
                .fetch_optional(&self.pool)
                .await?;
        if known.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query(
            "SELECT cid FROM channel_query_entries WHERE signature = ? ORDER BY position",
        )
        .bind(signature)
        .fetch_all(&self.pool)
        .await?;
        let cids = rows
            .into_iter()
            .map(|row| {
                let raw: String = row.try_get(0)?;
                raw.parse::<Cid>()
                    .with_context(|| format!("invalid cid '{raw}' stored for query {signature}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(cids))
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_in_memory(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
