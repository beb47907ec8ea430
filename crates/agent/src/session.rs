//! Per-session state, keyed by [`SessionId`].
//!
//! Each session owns one scored memory and one profile behind its own async
//! mutex. Holding that mutex for a whole turn is what serializes turns within
//! a session; different sessions never contend.

use std::collections::HashMap;
use std::sync::Arc;

use emberbot_core::session::SessionId;
use emberbot_memory::ScoredMemory;
use emberbot_profile::UserProfile;
use tokio::sync::{Mutex, RwLock};

/// In-process state of one session.
#[derive(Debug)]
pub struct SessionState {
    pub memory: ScoredMemory,
    pub profile: UserProfile,
    /// Whether persisted state has been pulled in yet.
    pub loaded: bool,
}

impl SessionState {
    pub fn new(max_pairs: usize) -> Self {
        Self {
            memory: ScoredMemory::new(max_pairs),
            profile: UserProfile::new(),
            loaded: false,
        }
    }
}

pub type SharedSession = Arc<Mutex<SessionState>>;

/// All live sessions.
pub struct SessionRegistry {
    max_pairs: usize,
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
}

impl SessionRegistry {
    pub fn new(max_pairs: usize) -> Self {
        Self {
            max_pairs,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The state for `id`, created empty on first use.
    pub async fn get(&self, id: &SessionId) -> SharedSession {
        if let Some(state) = self.sessions.read().await.get(id) {
            return Arc::clone(state);
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(SessionState::new(self.max_pairs)))),
        )
    }

    /// Forget `id`. Returns whether it was live.
    pub async fn remove(&self, id: &SessionId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
