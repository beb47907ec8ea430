//! Shared test helpers for engine tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use emberbot_core::error::{ProviderError, StorageError};
use emberbot_core::message::ChatMessage;
use emberbot_core::provider::{
    Provider, ProviderRequest, ProviderResponse, StreamChunk, StreamReceiver, Usage,
};
use emberbot_core::session::SessionId;
use emberbot_core::storage::{ChatTurnRecord, ProfileRecord, Storage};
use emberbot_retrieval::{CorpusSource, HashingEmbedder, RetrievalService};
use tokio::sync::{Notify, mpsc};

use crate::engine::{ChatEngine, EngineSettings};

const CORPUS: &str = "\
Your code has more bugs than a python nest.

Git blame was invented for people like you.

Skipping leg day again? The gym misses you.
";

enum Script {
    /// One whole reply per `complete` call, in order.
    Replies(VecDeque<String>),
    /// Fragments for `stream`, then an optional error.
    Fragments {
        parts: Vec<String>,
        error: Option<ProviderError>,
    },
    /// Every call fails.
    Failing(ProviderError),
}

/// A provider that plays back a script and records every request.
pub struct ScriptedProvider {
    script: Mutex<Script>,
    requests: Mutex<Vec<ProviderRequest>>,
    /// When set, streaming pauses after the first fragment until released.
    gate: Option<Arc<Notify>>,
}

impl ScriptedProvider {
    fn with_script(script: Script, gate: Option<Arc<Notify>>) -> Self {
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
            gate,
        }
    }

    pub fn replies(replies: &[&str]) -> Self {
        Self::with_script(
            Script::Replies(replies.iter().map(|r| r.to_string()).collect()),
            None,
        )
    }

    pub fn fragments(parts: &[&str], error: Option<ProviderError>) -> Self {
        Self::with_script(
            Script::Fragments {
                parts: parts.iter().map(|p| p.to_string()).collect(),
                error,
            },
            None,
        )
    }

    /// Streams `parts`, stalling after the first until [`release`](Self::release).
    pub fn gated(parts: &[&str]) -> Self {
        Self::with_script(
            Script::Fragments {
                parts: parts.iter().map(|p| p.to_string()).collect(),
                error: None,
            },
            Some(Arc::new(Notify::new())),
        )
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::with_script(Script::Failing(error), None)
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut script = self.script.lock().unwrap();
        let text = match &mut *script {
            Script::Replies(queue) => queue
                .pop_front()
                .unwrap_or_else(|| panic!("ScriptedProvider: no more replies")),
            Script::Fragments { parts, .. } => parts.concat(),
            Script::Failing(e) => return Err(e.clone()),
        };
        Ok(make_text_response(&text))
    }

    async fn stream(&self, request: ProviderRequest) -> Result<StreamReceiver, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let (parts, error) = {
            let mut script = self.script.lock().unwrap();
            match &mut *script {
                Script::Fragments { parts, error } => (parts.clone(), error.clone()),
                Script::Replies(queue) => (queue.pop_front().into_iter().collect(), None),
                Script::Failing(e) => return Err(e.clone()),
            }
        };

        let (tx, rx) = mpsc::channel(1);
        let gate = self.gate.clone();
        tokio::spawn(async move {
            for (i, part) in parts.into_iter().enumerate() {
                let chunk = StreamChunk {
                    content: Some(part),
                    done: false,
                    usage: None,
                };
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
                if let (0, Some(gate)) = (i, &gate) {
                    gate.notified().await;
                }
            }
            let last = match error {
                Some(e) => Err(e),
                None => Ok(StreamChunk {
                    content: None,
                    done: true,
                    usage: None,
                }),
            };
            let _ = tx.send(last).await;
        });
        Ok(rx)
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: ChatMessage::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Storage whose every call fails.
pub struct FailingStorage;

fn down() -> StorageError {
    StorageError::Storage("disk on fire".into())
}

#[async_trait::async_trait]
impl Storage for FailingStorage {
    fn name(&self) -> &str {
        "failing"
    }
    async fn append_turn(&self, _turn: &ChatTurnRecord) -> Result<(), StorageError> {
        Err(down())
    }
    async fn load_turns(&self, _s: &SessionId, _limit: usize) -> Result<Vec<ChatTurnRecord>, StorageError> {
        Err(down())
    }
    async fn clear_turns(&self, _s: &SessionId) -> Result<(), StorageError> {
        Err(down())
    }
    async fn save_profile(&self, _record: &ProfileRecord) -> Result<(), StorageError> {
        Err(down())
    }
    async fn load_profile(&self, _s: &SessionId) -> Result<Option<ProfileRecord>, StorageError> {
        Err(down())
    }
    async fn clear_profile(&self, _s: &SessionId) -> Result<(), StorageError> {
        Err(down())
    }
    async fn session_count(&self) -> Result<usize, StorageError> {
        Err(down())
    }
    async fn total_turns(&self) -> Result<usize, StorageError> {
        Err(down())
    }
}

/// A retrieval service over a tiny in-memory corpus.
pub fn fixture_retrieval() -> Arc<RetrievalService> {
    Arc::new(RetrievalService::new(
        CorpusSource::Text(CORPUS.into()),
        300,
        Arc::new(HashingEmbedder::default()),
    ))
}

pub fn engine_with(provider: Arc<dyn Provider>, storage: Arc<dyn Storage>) -> ChatEngine {
    ChatEngine::new(provider, fixture_retrieval(), storage, EngineSettings::default())
}

/// Drain a fragment receiver until the sender side is gone.
pub async fn recv_all(mut rx: mpsc::Receiver<String>) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(part) = rx.recv().await {
        out.push(part);
    }
    out
}
