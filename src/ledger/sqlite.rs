use super::{AppendOutcome, LedgerStore, UrlEntry};
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::DateTime;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::path::Path;

/// SQLite-backed ledger store.
///
/// `ledgers` holds one row per channel (primary key = channel id, which is
/// the uniqueness guarantee `get_or_create` relies on); `entries` holds the
/// append-only submissions, ordered by rowid.
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    /// Open (or create) the database at `db_path`.
    pub async fn open(db_path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Migration(format!("create db directory: {e}")))?;
        }

        let url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePool::connect(&url)
            .await
            .map_err(|e| StorageError::Sqlx(e.to_string()))?;

        init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// Capped at one connection: each pooled SQLite connection would
    /// otherwise get its own private in-memory database.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StorageError::Sqlx(e.to_string()))?;

        init_schema(&pool).await?;
        Ok(Self { pool })
    }
}

async fn init_schema(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS ledgers (
            channel_id TEXT PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS entries (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            channel_id   TEXT NOT NULL,
            url          TEXT NOT NULL,
            description  TEXT NOT NULL DEFAULT '',
            title        TEXT NOT NULL DEFAULT '',
            submitter    TEXT NOT NULL,
            timestamp_ms INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_entries_channel_url
            ON entries(channel_id, url);",
    )
    .execute(pool)
    .await
    .map_err(|e| StorageError::Migration(e.to_string()))?;

    Ok(())
}

type EntryRow = (String, String, String, String, i64);

fn row_to_entry((url, description, title, submitter, timestamp_ms): EntryRow) -> UrlEntry {
    UrlEntry {
        url,
        description,
        title,
        submitter,
        timestamp: DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_default(),
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn get_or_create(&self, channel_id: &str) -> Result<(), StorageError> {
        sqlx::query("INSERT OR IGNORE INTO ledgers (channel_id) VALUES (?1)")
            .bind(channel_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(())
    }

    async fn find_entry(
        &self,
        channel_id: &str,
        url: &str,
    ) -> Result<Option<UrlEntry>, StorageError> {
        let row: Option<EntryRow> = sqlx::query_as(
            "SELECT url, description, title, submitter, timestamp_ms
             FROM entries WHERE channel_id = ?1 AND url = ?2
             ORDER BY id LIMIT 1",
        )
        .bind(channel_id)
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(row.map(row_to_entry))
    }

    async fn append(
        &self,
        channel_id: &str,
        entry: &UrlEntry,
    ) -> Result<AppendOutcome, StorageError> {
        // Single statement, so the existence check and the insert are atomic.
        let result = sqlx::query(
            "INSERT INTO entries (channel_id, url, description, title, submitter, timestamp_ms)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6
             WHERE NOT EXISTS (
                 SELECT 1 FROM entries WHERE channel_id = ?1 AND url = ?2
             )",
        )
        .bind(channel_id)
        .bind(&entry.url)
        .bind(&entry.description)
        .bind(&entry.title)
        .bind(&entry.submitter)
        .bind(entry.timestamp.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        if result.rows_affected() == 1 {
            Ok(AppendOutcome::Appended)
        } else {
            Ok(AppendOutcome::AlreadyRecorded)
        }
    }

    async fn entries(&self, channel_id: &str) -> Result<Vec<UrlEntry>, StorageError> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            "SELECT url, description, title, submitter, timestamp_ms
             FROM entries WHERE channel_id = ?1 ORDER BY id",
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(rows.into_iter().map(row_to_entry).collect())
    }
}
