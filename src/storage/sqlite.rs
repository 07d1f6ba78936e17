//! SQLite record storage

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;

use super::{RecordBackend, StorageError, StorageRecord};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS annotation_records (
    resource_id TEXT PRIMARY KEY,
    record_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// One row per resource, holding the record as JSON
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Open (creating if missing) the database at `database_url`
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Use an existing pool, creating the table if needed
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        sqlx::query(SCHEMA_SQL).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RecordBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn load(&self, resource_id: &str) -> Result<Option<StorageRecord>, StorageError> {
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT record_json FROM annotation_records WHERE resource_id = ?",
        )
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: &StorageRecord) -> Result<(), StorageError> {
        let json = serde_json::to_string(record)?;

        sqlx::query(
            r#"
            INSERT INTO annotation_records (resource_id, record_json, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(resource_id) DO UPDATE SET
                record_json = excluded.record_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.id)
        .bind(&json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
