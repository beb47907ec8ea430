//! Storage trait — durable persistence of chat turns and profile snapshots.
//!
//! The engine treats storage as a simple append log plus a key-value slot
//! per session. State is loaded once when a session starts and written after
//! every completed turn. Failures are the caller's to log and swallow.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::StorageError;
use crate::session::SessionId;

/// One persisted user/assistant exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurnRecord {
    pub session_id: SessionId,
    pub user_text: String,
    pub bot_text: String,
    /// Importance shared by both halves of the exchange.
    pub importance: u8,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurnRecord {
    pub fn new(
        session_id: SessionId,
        user_text: impl Into<String>,
        bot_text: impl Into<String>,
        importance: u8,
    ) -> Self {
        Self {
            session_id,
            user_text: user_text.into(),
            bot_text: bot_text.into(),
            importance,
            timestamp: Utc::now(),
        }
    }
}

/// A serialized profile snapshot for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub session_id: SessionId,
    /// Flat record produced by the profile's own serializer.
    pub profile: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// The core Storage trait.
///
/// Implementations: SQLite, in-memory (for testing), none (no-op).
#[async_trait]
pub trait Storage: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory", "none").
    fn name(&self) -> &str;

    /// Append one completed turn.
    async fn append_turn(&self, turn: &ChatTurnRecord) -> Result<(), StorageError>;

    /// Load the most recent `limit` turns of a session, oldest first.
    async fn load_turns(&self, session: &SessionId, limit: usize) -> Result<Vec<ChatTurnRecord>, StorageError>;

    /// Delete every turn of a session. Idempotent.
    async fn clear_turns(&self, session: &SessionId) -> Result<(), StorageError>;

    /// Insert or replace the profile snapshot of a session.
    async fn save_profile(&self, record: &ProfileRecord) -> Result<(), StorageError>;

    /// Load the profile snapshot of a session, if any.
    async fn load_profile(&self, session: &SessionId) -> Result<Option<ProfileRecord>, StorageError>;

    /// Delete the profile snapshot of a session. Idempotent.
    async fn clear_profile(&self, session: &SessionId) -> Result<(), StorageError>;

    /// Number of distinct sessions with at least one stored turn.
    async fn session_count(&self) -> Result<usize, StorageError>;

    /// Total number of stored turns across all sessions.
    async fn total_turns(&self) -> Result<usize, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_record_serialization() {
        let turn = ChatTurnRecord::new(SessionId::from("s1"), "I use vim", "Of course you do.", 4);
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("I use vim"));
        let back: ChatTurnRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, turn);
    }
}
