//! In-memory storage — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use emberbot_core::error::StorageError;
use emberbot_core::session::SessionId;
use emberbot_core::storage::{ChatTurnRecord, ProfileRecord, Storage};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Stores turns and profiles in process memory. Lost on exit.
#[derive(Default)]
pub struct InMemoryStorage {
    turns: RwLock<Vec<ChatTurnRecord>>,
    profiles: RwLock<HashMap<SessionId, ProfileRecord>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append_turn(&self, turn: &ChatTurnRecord) -> Result<(), StorageError> {
        self.turns.write().await.push(turn.clone());
        Ok(())
    }

    async fn load_turns(&self, session: &SessionId, limit: usize) -> Result<Vec<ChatTurnRecord>, StorageError> {
        let turns = self.turns.read().await;
        let mut recent: Vec<ChatTurnRecord> = turns
            .iter()
            .rev()
            .filter(|t| &t.session_id == session)
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        Ok(recent)
    }

    async fn clear_turns(&self, session: &SessionId) -> Result<(), StorageError> {
        self.turns.write().await.retain(|t| &t.session_id != session);
        Ok(())
    }

    async fn save_profile(&self, record: &ProfileRecord) -> Result<(), StorageError> {
        self.profiles
            .write()
            .await
            .insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    async fn load_profile(&self, session: &SessionId) -> Result<Option<ProfileRecord>, StorageError> {
        Ok(self.profiles.read().await.get(session).cloned())
    }

    async fn clear_profile(&self, session: &SessionId) -> Result<(), StorageError> {
        self.profiles.write().await.remove(session);
        Ok(())
    }

    async fn session_count(&self) -> Result<usize, StorageError> {
        let turns = self.turns.read().await;
        Ok(turns.iter().map(|t| &t.session_id).collect::<HashSet<_>>().len())
    }

    async fn total_turns(&self) -> Result<usize, StorageError> {
        Ok(self.turns.read().await.len())
    }
}
