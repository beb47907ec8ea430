//! No-op storage — disables persistence entirely.

use async_trait::async_trait;
use emberbot_core::error::StorageError;
use emberbot_core::session::SessionId;
use emberbot_core::storage::{ChatTurnRecord, ProfileRecord, Storage};

/// A storage backend that stores nothing.
pub struct NoopStorage;

#[async_trait]
impl Storage for NoopStorage {
    fn name(&self) -> &str {
        "none"
    }

    async fn append_turn(&self, _turn: &ChatTurnRecord) -> Result<(), StorageError> {
        Ok(())
    }

    async fn load_turns(&self, _session: &SessionId, _limit: usize) -> Result<Vec<ChatTurnRecord>, StorageError> {
        Ok(Vec::new())
    }

    async fn clear_turns(&self, _session: &SessionId) -> Result<(), StorageError> {
        Ok(())
    }

    async fn save_profile(&self, _record: &ProfileRecord) -> Result<(), StorageError> {
        Ok(())
    }

    async fn load_profile(&self, _session: &SessionId) -> Result<Option<ProfileRecord>, StorageError> {
        Ok(None)
    }

    async fn clear_profile(&self, _session: &SessionId) -> Result<(), StorageError> {
        Ok(())
    }

    async fn session_count(&self) -> Result<usize, StorageError> {
        Ok(0)
    }

    async fn total_turns(&self) -> Result<usize, StorageError> {
        Ok(0)
    }
}
