//! SQLite storage backend.
//!
//! Uses a single SQLite database file with two tables:
//! - `chat_history` — one row per completed user/assistant exchange
//! - `user_profiles` — one JSON profile snapshot per session

use async_trait::async_trait;
use chrono::Utc;
use emberbot_core::error::StorageError;
use emberbot_core::session::SessionId;
use emberbot_core::storage::{ChatTurnRecord, ProfileRecord, Storage};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// Durable chat history and profile storage in SQLite.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) the database at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StorageError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite://{path}")
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| StorageError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // An in-memory database lives per connection
        let max_connections = if url.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Storage(format!("Failed to open SQLite: {e}")))?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        info!("SQLite storage initialized at {path}");
        Ok(storage)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_history (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id    TEXT NOT NULL,
                user_message  TEXT NOT NULL,
                bot_response  TEXT NOT NULL,
                importance    INTEGER NOT NULL DEFAULT 0,
                timestamp     TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("chat_history table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chat_history_session ON chat_history(session_id, id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("session index: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_profiles (
                session_id  TEXT PRIMARY KEY,
                profile     TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("user_profiles table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_turn(row: &sqlx::sqlite::SqliteRow) -> Result<ChatTurnRecord, StorageError> {
        let session_id: String = row
            .try_get("session_id")
            .map_err(|e| StorageError::QueryFailed(format!("session_id column: {e}")))?;
        let user_text: String = row
            .try_get("user_message")
            .map_err(|e| StorageError::QueryFailed(format!("user_message column: {e}")))?;
        let bot_text: String = row
            .try_get("bot_response")
            .map_err(|e| StorageError::QueryFailed(format!("bot_response column: {e}")))?;
        let importance: i64 = row.try_get("importance").unwrap_or(0);
        let timestamp_str: String = row
            .try_get("timestamp")
            .map_err(|e| StorageError::QueryFailed(format!("timestamp column: {e}")))?;

        let timestamp = chrono::DateTime::parse_from_rfc3339(&timestamp_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(ChatTurnRecord {
            session_id: SessionId::from(session_id),
            user_text,
            bot_text,
            importance: importance.clamp(0, 10) as u8,
            timestamp,
        })
    }

    async fn count(&self, sql: &str) -> Result<usize, StorageError> {
        let row = sqlx::query(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StorageError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt.max(0) as usize)
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn append_turn(&self, turn: &ChatTurnRecord) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO chat_history (session_id, user_message, bot_response, importance, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(turn.session_id.as_str())
        .bind(&turn.user_text)
        .bind(&turn.bot_text)
        .bind(i64::from(turn.importance))
        .bind(turn.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(format!("INSERT failed: {e}")))?;

        debug!(session = %turn.session_id, "Stored chat turn");
        Ok(())
    }

    async fn load_turns(&self, session: &SessionId, limit: usize) -> Result<Vec<ChatTurnRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM chat_history WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2",
        )
        .bind(session.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("Load turns: {e}")))?;

        let mut turns = rows
            .iter()
            .map(Self::row_to_turn)
            .collect::<Result<Vec<_>, _>>()?;
        turns.reverse();
        Ok(turns)
    }

    async fn clear_turns(&self, session: &SessionId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM chat_history WHERE session_id = ?1")
            .bind(session.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Storage(format!("DELETE failed: {e}")))?;
        Ok(())
    }

    async fn save_profile(&self, record: &ProfileRecord) -> Result<(), StorageError> {
        let profile_json = serde_json::to_string(&record.profile)
            .map_err(|e| StorageError::Storage(format!("Profile serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO user_profiles (session_id, profile, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session_id) DO UPDATE SET
                profile = excluded.profile,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.session_id.as_str())
        .bind(&profile_json)
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(format!("UPSERT failed: {e}")))?;

        Ok(())
    }

    async fn load_profile(&self, session: &SessionId) -> Result<Option<ProfileRecord>, StorageError> {
        let row = sqlx::query("SELECT * FROM user_profiles WHERE session_id = ?1")
            .bind(session.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("Load profile: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let profile_json: String = row
            .try_get("profile")
            .map_err(|e| StorageError::QueryFailed(format!("profile column: {e}")))?;
        let updated_at_str: String = row
            .try_get("updated_at")
            .map_err(|e| StorageError::QueryFailed(format!("updated_at column: {e}")))?;

        let profile = serde_json::from_str(&profile_json)
            .map_err(|e| StorageError::QueryFailed(format!("Corrupt profile JSON: {e}")))?;
        let updated_at = chrono::DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(ProfileRecord {
            session_id: session.clone(),
            profile,
            updated_at,
        }))
    }

    async fn clear_profile(&self, session: &SessionId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM user_profiles WHERE session_id = ?1")
            .bind(session.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Storage(format!("DELETE failed: {e}")))?;
        Ok(())
    }

    async fn session_count(&self) -> Result<usize, StorageError> {
        self.count("SELECT COUNT(DISTINCT session_id) AS cnt FROM chat_history")
            .await
    }

    async fn total_turns(&self) -> Result<usize, StorageError> {
        self.count("SELECT COUNT(*) AS cnt FROM chat_history").await
    }
}
