//! Conversation memory for emberbot.
//!
//! - [`ScoredMemory`]: per-session ring of importance-scored messages
//! - [`trim_history`]: importance-aware trimming to a token budget
//! - [`Storage`](emberbot_core::Storage) backends: SQLite, in-memory, none

pub mod in_memory;
pub mod noop;
pub mod scored;
pub mod token;
pub mod trim;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use emberbot_config::StorageConfig;
use emberbot_core::error::StorageError;
use emberbot_core::storage::Storage;

pub use in_memory::InMemoryStorage;
pub use noop::NoopStorage;
pub use scored::{DEFAULT_MAX_PAIRS, ScoredMemory};
#[cfg(feature = "local")]
pub use token::HfTokenCounter;
pub use token::{TokenCounter, WordApprox, count_tokens};
pub use trim::{DEFAULT_BUDGET, MIN_MESSAGES, PROTECTED_TAIL, trim_history};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

/// Open the storage backend named in configuration.
pub async fn storage_from_config(config: &StorageConfig) -> Result<Arc<dyn Storage>, StorageError> {
    match config.backend.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = config.db_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Storage(format!("Cannot create {}: {e}", parent.display()))
                })?;
            }
            let storage = SqliteStorage::new(&path.to_string_lossy()).await?;
            Ok(Arc::new(storage))
        }
        "memory" | "in_memory" => Ok(Arc::new(InMemoryStorage::new())),
        "none" => Ok(Arc::new(NoopStorage)),
        other => Err(StorageError::Storage(format!(
            "Unknown storage backend '{other}'"
        ))),
    }
}

/// Pick a token counter from the `[memory] tokenizer` setting.
#[cfg_attr(not(feature = "local"), allow(unused_variables))]
pub fn token_counter_from_config(tokenizer: &str, model: &str) -> Arc<dyn TokenCounter> {
    match tokenizer {
        #[cfg(feature = "local")]
        "local" => match HfTokenCounter::from_hub(model) {
            Ok(counter) => Arc::new(counter),
            Err(e) => {
                tracing::warn!(error = %e, "Tokenizer unavailable, using word approximation");
                Arc::new(WordApprox)
            }
        },
        _ => Arc::new(WordApprox),
    }
}
