//! The chat engine — one roast per turn.
//!
//! Every turn runs the same pipeline:
//!
//! 1. **Validate** the raw input (canned reply on empty or oversized text)
//! 2. **Score** the message and fold it into the session profile
//! 3. **Retrieve** roast context for the raw input
//! 4. **Trim** the session history to the token budget
//! 5. **Assemble** persona + profile block, history, context + input
//! 6. **Complete** via the provider (whole reply or streamed fragments)
//! 7. **Record** the exchange in memory and storage
//!
//! No error escapes a turn. Provider failures become an apology reply,
//! storage failures are logged and swallowed.

use std::sync::Arc;

use emberbot_config::AppConfig;
use emberbot_core::error::{Error, ProviderError};
use emberbot_core::message::{Role, ScoredMessage};
use emberbot_core::provider::{Provider, ProviderRequest};
use emberbot_core::session::SessionId;
use emberbot_core::storage::{ChatTurnRecord, Storage};
use emberbot_memory::{InMemoryStorage, TokenCounter, WordApprox, trim_history};
use emberbot_profile::{ProfileSummary, UserProfile};
use emberbot_retrieval::RetrievalService;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::assembler::{PromptParts, assemble};
use crate::persona::RoastMode;
use crate::session::{SessionRegistry, SessionState};
use crate::validation::validate_input;

/// Prefix of every reply that stands in for a failed completion.
pub const APOLOGY_PREFIX: &str = "Even I broke trying to roast you. Error: ";

/// Characters of the error text shown to the user.
const APOLOGY_DETAIL_CHARS: usize = 100;

/// Fragments buffered between the streaming task and its reader.
const STREAM_BUFFER: usize = 128;

/// Turn the provider error into the user-visible apology.
pub fn apology(err: &ProviderError) -> String {
    let detail: String = err.to_string().chars().take(APOLOGY_DETAIL_CHARS).collect();
    format!("{APOLOGY_PREFIX}{detail}")
}

/// Knobs for a [`ChatEngine`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Chunks retrieved per turn
    pub top_k: usize,
    /// Soft token limit for the history sent with each prompt
    pub history_token_budget: usize,
    /// Exchanges kept in memory per session
    pub max_pairs: usize,
    pub roast_mode: RoastMode,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            model: "llama-3.1-8b-instant".into(),
            temperature: 0.8,
            max_tokens: Some(512),
            top_k: 3,
            history_token_budget: emberbot_memory::DEFAULT_BUDGET,
            max_pairs: emberbot_memory::DEFAULT_MAX_PAIRS,
            roast_mode: RoastMode::default(),
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
            top_k: config.retrieval.top_k,
            history_token_budget: config.memory.history_token_budget,
            max_pairs: config.memory.max_pairs,
            roast_mode: RoastMode::parse_lossy(&config.roast_mode),
        }
    }
}

/// Runs turns for any number of sessions.
pub struct ChatEngine {
    provider: Arc<dyn Provider>,
    retrieval: Arc<RetrievalService>,
    storage: Arc<dyn Storage>,
    token_counter: Arc<dyn TokenCounter>,
    sessions: SessionRegistry,
    settings: EngineSettings,
}

impl ChatEngine {
    pub fn new(
        provider: Arc<dyn Provider>,
        retrieval: Arc<RetrievalService>,
        storage: Arc<dyn Storage>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            provider,
            retrieval,
            storage,
            token_counter: Arc::new(WordApprox),
            sessions: SessionRegistry::new(settings.max_pairs),
            settings,
        }
    }

    /// Use a real tokenizer for the history budget.
    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.token_counter = counter;
        self
    }

    pub fn with_roast_mode(mut self, mode: RoastMode) -> Self {
        self.settings.roast_mode = mode;
        self
    }

    /// Wire up provider, retrieval, storage and tokenizer from configuration.
    ///
    /// Fails only when no provider can be built. A storage backend that
    /// cannot be opened is replaced by in-process storage.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let provider = emberbot_providers::build_from_config(config)?;

        let retrieval =
            emberbot_retrieval::service_from_config(&config.retrieval, Some(Arc::clone(&provider)))
                .await;

        let storage: Arc<dyn Storage> =
            match emberbot_memory::storage_from_config(&config.storage).await {
                Ok(storage) => storage,
                Err(e) => {
                    warn!(error = %e, "Storage unavailable, history will not survive restarts");
                    Arc::new(InMemoryStorage::new())
                }
            };

        let tokenizer = config.memory.tokenizer.clone();
        let model = config.retrieval.embedding_model.clone();
        let token_counter: Arc<dyn TokenCounter> = match tokio::task::spawn_blocking(move || {
            emberbot_memory::token_counter_from_config(&tokenizer, &model)
        })
        .await
        {
            Ok(counter) => counter,
            Err(e) => {
                warn!(error = %e, "Tokenizer setup panicked, using word approximation");
                Arc::new(WordApprox)
            }
        };

        info!(
            provider = provider.name(),
            storage = storage.name(),
            embedder = retrieval.embedder_name(),
            model = %config.model,
            "Chat engine ready"
        );

        Ok(Self::new(
            provider,
            Arc::new(retrieval),
            storage,
            EngineSettings::from_config(config),
        )
        .with_token_counter(token_counter))
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn retrieval(&self) -> &Arc<RetrievalService> {
        &self.retrieval
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Run one turn and return the whole reply.
    pub async fn chat(&self, session: &SessionId, raw: &str) -> String {
        let input = match validate_input(raw) {
            Ok(input) => input,
            Err(reply) => return reply.to_string(),
        };

        let state = self.sessions.get(session).await;
        let mut state = state.lock().await;
        self.ensure_loaded(session, &mut state).await;

        let (request, importance) = self.prepare(&mut state, input, false).await;

        match self.provider.complete(request).await {
            Ok(response) => {
                let reply = response.message.content;
                self.record_turn(session, &mut state, input, &reply, importance)
                    .await;
                reply
            }
            Err(e) => {
                warn!(session = %session, error = %e, "Completion failed");
                apology(&e)
            }
        }
    }

    /// Run one turn, yielding reply fragments as they arrive.
    ///
    /// Concatenating everything received gives the reply. Dropping the
    /// receiver abandons the turn; nothing from it is persisted.
    pub fn chat_stream(self: &Arc<Self>, session: SessionId, raw: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        let input = match validate_input(raw) {
            Ok(input) => input.to_string(),
            Err(reply) => {
                let _ = tx.try_send(reply.to_string());
                return rx;
            }
        };

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.run_stream(session, input, tx).await;
        });

        rx
    }

    async fn run_stream(&self, session: SessionId, input: String, tx: mpsc::Sender<String>) {
        let state = self.sessions.get(&session).await;
        let mut state = state.lock().await;
        self.ensure_loaded(&session, &mut state).await;

        let (request, importance) = self.prepare(&mut state, &input, true).await;

        let mut chunks = match self.provider.stream(request).await {
            Ok(rx) => rx,
            Err(e) => {
                warn!(session = %session, error = %e, "Stream failed to start");
                let _ = tx.send(apology(&e)).await;
                return;
            }
        };

        let mut reply = String::new();
        while let Some(item) = chunks.recv().await {
            match item {
                Ok(chunk) => {
                    if let Some(text) = chunk.content.filter(|t| !t.is_empty()) {
                        reply.push_str(&text);
                        if tx.send(text).await.is_err() {
                            debug!(session = %session, "Stream abandoned by reader, turn dropped");
                            return;
                        }
                    }
                    if chunk.done {
                        break;
                    }
                }
                Err(e) => {
                    warn!(session = %session, error = %e, "Stream interrupted");
                    let fragment = if reply.is_empty() {
                        apology(&e)
                    } else {
                        format!("\n\n{}", apology(&e))
                    };
                    if tx.send(fragment).await.is_err() {
                        return;
                    }
                    if !reply.is_empty() {
                        self.record_turn(&session, &mut state, &input, &reply, importance)
                            .await;
                    }
                    return;
                }
            }
        }

        self.record_turn(&session, &mut state, &input, &reply, importance)
            .await;
    }

    /// Score, retrieve, trim and assemble. Returns the request and the
    /// importance shared by both halves of the exchange.
    async fn prepare(
        &self,
        state: &mut SessionState,
        input: &str,
        stream: bool,
    ) -> (ProviderRequest, u8) {
        let importance = state.profile.update(input, "");
        let context = self.retrieval.search(input, self.settings.top_k).await;

        let history = state.memory.all();
        let trimmed = trim_history(
            &history,
            self.settings.history_token_budget,
            self.token_counter.as_ref(),
        );
        let snippet = state.profile.to_snippet();

        debug!(
            importance,
            history = history.len(),
            sent = trimmed.len(),
            profiled = !snippet.is_empty(),
            "Prompt prepared"
        );

        let messages = assemble(PromptParts {
            base_prompt: self.settings.roast_mode.system_prompt(),
            profile_snippet: &snippet,
            retrieved_context: &context,
            history: trimmed,
            current_input: input,
        });

        let request = ProviderRequest {
            model: self.settings.model.clone(),
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            stream,
            stop: vec![],
        };

        (request, importance)
    }

    async fn record_turn(
        &self,
        session: &SessionId,
        state: &mut SessionState,
        input: &str,
        reply: &str,
        importance: u8,
    ) {
        if reply.is_empty() {
            debug!(session = %session, "Empty reply, turn not recorded");
            return;
        }
        state.memory.append(Role::User, input, importance);
        state.memory.append(Role::Assistant, reply, importance);

        let turn = ChatTurnRecord::new(session.clone(), input, reply, importance);
        if let Err(e) = self.storage.append_turn(&turn).await {
            warn!(session = %session, error = %e, "Failed to persist turn");
        }
        let profile = state.profile.to_storage_record(session);
        if let Err(e) = self.storage.save_profile(&profile).await {
            warn!(session = %session, error = %e, "Failed to persist profile");
        }
    }

    /// Pull the persisted profile and recent turns into a fresh session.
    async fn ensure_loaded(&self, session: &SessionId, state: &mut SessionState) {
        if state.loaded {
            return;
        }
        state.loaded = true;

        match self.storage.load_profile(session).await {
            Ok(Some(record)) => state.profile = UserProfile::from_storage_record(&record),
            Ok(None) => {}
            Err(e) => warn!(session = %session, error = %e, "Failed to load profile"),
        }

        match self.storage.load_turns(session, self.settings.max_pairs).await {
            Ok(turns) => {
                for turn in &turns {
                    state.memory.append(Role::User, turn.user_text.as_str(), turn.importance);
                    state.memory.append(Role::Assistant, turn.bot_text.as_str(), turn.importance);
                }
                if !turns.is_empty() {
                    info!(session = %session, turns = turns.len(), "Session restored");
                }
            }
            Err(e) => warn!(session = %session, error = %e, "Failed to load history"),
        }
    }

    /// Forget everything about a session, in memory and in storage.
    pub async fn clear_session(&self, session: &SessionId) {
        let state = self.sessions.get(session).await;
        let mut state = state.lock().await;
        state.memory.clear();
        state.profile.reset();
        state.loaded = true;

        if let Err(e) = self.storage.clear_turns(session).await {
            warn!(session = %session, error = %e, "Failed to clear stored turns");
        }
        if let Err(e) = self.storage.clear_profile(session).await {
            warn!(session = %session, error = %e, "Failed to clear stored profile");
        }
        // A turn already waiting on the old state still finishes against it.
        // The next lookup starts fresh and rehydrates from storage.
        self.sessions.remove(session).await;
        info!(session = %session, "Session cleared");
    }

    /// What the bot has learned about the user of `session`.
    pub async fn profile(&self, session: &SessionId) -> ProfileSummary {
        let state = self.sessions.get(session).await;
        let mut state = state.lock().await;
        self.ensure_loaded(session, &mut state).await;
        state.profile.summary()
    }

    /// The session's scored history, oldest first.
    pub async fn history(&self, session: &SessionId) -> Vec<ScoredMessage> {
        let state = self.sessions.get(session).await;
        let mut state = state.lock().await;
        self.ensure_loaded(session, &mut state).await;
        state.memory.all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        FailingStorage, ScriptedProvider, engine_with, fixture_retrieval, recv_all,
    };
    use crate::validation::{EMPTY_INPUT_REPLY, TOO_LONG_REPLY};
    use emberbot_memory::InMemoryStorage;

    fn sid(s: &str) -> SessionId {
        SessionId::from(s)
    }

    #[tokio::test]
    async fn simple_turn_is_recorded() {
        let provider = Arc::new(ScriptedProvider::replies(&["Nice try, vim user."]));
        let storage = Arc::new(InMemoryStorage::new());
        let engine = engine_with(provider.clone(), storage.clone());

        let reply = engine.chat(&sid("s"), "I am a Python developer").await;
        assert_eq!(reply, "Nice try, vim user.");

        let history = engine.history(&sid("s")).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role(), Role::User);
        assert_eq!(history[0].content(), "I am a Python developer");
        assert_eq!(history[1].importance(), history[0].importance());
        assert_eq!(history[0].importance(), 4);

        assert_eq!(storage.total_turns().await.unwrap(), 1);
        assert!(storage.load_profile(&sid("s")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn empty_input_never_reaches_provider() {
        let provider = Arc::new(ScriptedProvider::replies(&[]));
        let engine = engine_with(provider.clone(), Arc::new(InMemoryStorage::new()));

        assert_eq!(engine.chat(&sid("s"), "").await, EMPTY_INPUT_REPLY);
        assert_eq!(engine.chat(&sid("s"), "   ").await, EMPTY_INPUT_REPLY);
        assert_eq!(provider.calls(), 0);
        assert_eq!(engine.profile(&sid("s")).await.turn_count, 0);
    }

    #[tokio::test]
    async fn oversized_input_is_refused() {
        let provider = Arc::new(ScriptedProvider::replies(&[]));
        let engine = engine_with(provider.clone(), Arc::new(InMemoryStorage::new()));
        let reply = engine.chat(&sid("s"), &"x".repeat(5001)).await;
        assert_eq!(reply, TOO_LONG_REPLY);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn prompt_layout() {
        let provider = Arc::new(ScriptedProvider::replies(&["first", "second"]));
        let engine = engine_with(provider.clone(), Arc::new(InMemoryStorage::new()));

        engine.chat(&sid("s"), "I am a Python developer").await;
        engine.chat(&sid("s"), "my code has a bug in git").await;

        let requests = provider.requests();
        let second = &requests[1];
        assert_eq!(second.messages[0].role, Role::System);
        assert!(second.messages[0].content.starts_with("You are RoastBot"));
        // Profile needs two turns; the second turn's update makes it two
        assert!(second.messages[0].content.contains("[USER PROFILE"));
        assert_eq!(second.messages[1].content, "I am a Python developer");
        assert_eq!(second.messages[2].content, "first");
        let last = second.messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert!(last.content.starts_with("Roast context:\n"));
        assert!(last.content.ends_with("\n\nCurrent message:\nmy code has a bug in git"));
        assert!(!second.stream);
    }

    #[tokio::test]
    async fn provider_failure_apologises_and_skips_memory() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::Network(
            "connection refused".into(),
        )));
        let storage = Arc::new(InMemoryStorage::new());
        let engine = engine_with(provider, storage.clone());

        let reply = engine.chat(&sid("s"), "roast my code please").await;
        assert!(reply.starts_with(APOLOGY_PREFIX));
        assert!(reply.contains("connection refused"));
        assert!(engine.history(&sid("s")).await.is_empty());
        assert_eq!(storage.total_turns().await.unwrap(), 0);
        // Profile still learned from the message
        assert_eq!(engine.profile(&sid("s")).await.turn_count, 1);
    }

    #[test]
    fn apology_detail_is_truncated() {
        let err = ProviderError::Network("z".repeat(500));
        let text = apology(&err);
        assert_eq!(text.chars().count(), APOLOGY_PREFIX.chars().count() + 100);
    }

    #[tokio::test]
    async fn storage_failures_do_not_break_turns() {
        let provider = Arc::new(ScriptedProvider::replies(&["burn one", "burn two"]));
        let engine = engine_with(provider, Arc::new(FailingStorage));

        assert_eq!(engine.chat(&sid("s"), "roast me please now").await, "burn one");
        assert_eq!(engine.chat(&sid("s"), "again, roast me harder").await, "burn two");
        assert_eq!(engine.history(&sid("s")).await.len(), 4);
        engine.clear_session(&sid("s")).await;
        assert!(engine.history(&sid("s")).await.is_empty());
    }

    #[tokio::test]
    async fn clear_is_idempotent_and_isolated() {
        let provider = Arc::new(ScriptedProvider::replies(&["a", "b"]));
        let storage = Arc::new(InMemoryStorage::new());
        let engine = engine_with(provider, storage.clone());

        engine.chat(&sid("one"), "I built a startup").await;
        engine.chat(&sid("two"), "I love the gym").await;

        engine.clear_session(&sid("one")).await;
        engine.clear_session(&sid("one")).await;

        assert!(engine.history(&sid("one")).await.is_empty());
        assert_eq!(engine.profile(&sid("one")).await.turn_count, 0);
        assert_eq!(engine.history(&sid("two")).await.len(), 2);
        assert_eq!(storage.total_turns().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_forgets_live_session() {
        let provider = Arc::new(ScriptedProvider::replies(&["a", "b"]));
        let storage = Arc::new(InMemoryStorage::new());
        let engine = engine_with(provider, storage.clone());

        engine.chat(&sid("one"), "I built a startup").await;
        engine.chat(&sid("two"), "I love the gym").await;
        assert_eq!(engine.sessions.len().await, 2);

        engine.clear_session(&sid("one")).await;
        assert!(!engine.sessions.contains(&sid("one")).await);
        assert!(engine.sessions.contains(&sid("two")).await);
        assert_eq!(engine.sessions.len().await, 1);
    }

    #[tokio::test]
    async fn empty_completion_is_not_recorded() {
        let provider = Arc::new(ScriptedProvider::replies(&[""]));
        let storage = Arc::new(InMemoryStorage::new());
        let engine = engine_with(provider, storage.clone());

        assert_eq!(engine.chat(&sid("s"), "roast me").await, "");
        assert!(engine.history(&sid("s")).await.is_empty());
        assert_eq!(storage.total_turns().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_stream_is_not_recorded() {
        let provider = Arc::new(ScriptedProvider::fragments(&[], None));
        let storage = Arc::new(InMemoryStorage::new());
        let engine = Arc::new(engine_with(provider, storage.clone()));

        let parts = recv_all(engine.chat_stream(sid("s"), "roast me")).await;
        assert!(parts.is_empty());
        assert!(engine.history(&sid("s")).await.is_empty());
        assert_eq!(storage.total_turns().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn session_is_restored_from_storage() {
        let storage = Arc::new(InMemoryStorage::new());

        let first = engine_with(
            Arc::new(ScriptedProvider::replies(&["r1", "r2"])),
            storage.clone(),
        );
        first.chat(&sid("s"), "I am a Python developer").await;
        first.chat(&sid("s"), "I can't center a div").await;

        // Fresh engine, same storage
        let provider = Arc::new(ScriptedProvider::replies(&["r3"]));
        let second = engine_with(provider.clone(), storage);
        assert_eq!(second.profile(&sid("s")).await.turn_count, 2);

        second.chat(&sid("s"), "what now?").await;
        let request = &provider.requests()[0];
        let contents: Vec<&str> = request.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents[1], "I am a Python developer");
        assert_eq!(contents[2], "r1");
        assert_eq!(contents[4], "r2");
    }

    #[tokio::test]
    async fn memory_cap_evicts_oldest() {
        let replies: Vec<String> = (0..5).map(|i| format!("reply {i}")).collect();
        let refs: Vec<&str> = replies.iter().map(String::as_str).collect();
        let provider = Arc::new(ScriptedProvider::replies(&refs));
        let settings = EngineSettings {
            max_pairs: 2,
            ..EngineSettings::default()
        };
        let engine = ChatEngine::new(
            provider,
            fixture_retrieval(),
            Arc::new(InMemoryStorage::new()),
            settings,
        );

        for i in 0..5 {
            engine.chat(&sid("s"), &format!("message number {i}")).await;
        }
        let history = engine.history(&sid("s")).await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content(), "message number 3");
    }

    #[tokio::test]
    async fn stream_yields_fragments_and_persists() {
        let provider = Arc::new(ScriptedProvider::fragments(&["Your ", "code ", "is art."], None));
        let storage = Arc::new(InMemoryStorage::new());
        let engine = Arc::new(engine_with(provider.clone(), storage.clone()));

        let rx = engine.chat_stream(sid("s"), "look at my code");
        let parts = recv_all(rx).await;
        assert_eq!(parts, vec!["Your ", "code ", "is art."]);

        let history = engine.history(&sid("s")).await;
        assert_eq!(history[1].content(), "Your code is art.");
        assert_eq!(storage.total_turns().await.unwrap(), 1);
        assert!(provider.requests()[0].stream);
    }

    #[tokio::test]
    async fn stream_error_keeps_partial_reply() {
        let provider = Arc::new(ScriptedProvider::fragments(
            &["Half a "],
            Some(ProviderError::StreamInterrupted("reset".into())),
        ));
        let engine = Arc::new(engine_with(provider, Arc::new(InMemoryStorage::new())));

        let parts = recv_all(engine.chat_stream(sid("s"), "roast me")).await;
        assert_eq!(parts[0], "Half a ");
        assert!(parts[1].starts_with("\n\nEven I broke"));

        let history = engine.history(&sid("s")).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content(), "Half a ");
    }

    #[tokio::test]
    async fn stream_error_without_output_is_not_persisted() {
        let provider = Arc::new(ScriptedProvider::fragments(
            &[],
            Some(ProviderError::StreamInterrupted("reset".into())),
        ));
        let engine = Arc::new(engine_with(provider, Arc::new(InMemoryStorage::new())));

        let parts = recv_all(engine.chat_stream(sid("s"), "roast me")).await;
        assert_eq!(parts.len(), 1);
        assert!(parts[0].starts_with(APOLOGY_PREFIX));
        assert!(engine.history(&sid("s")).await.is_empty());
    }

    #[tokio::test]
    async fn abandoned_stream_is_not_persisted() {
        let provider = Arc::new(ScriptedProvider::gated(&["one ", "two ", "three ", "four"]));
        let storage = Arc::new(InMemoryStorage::new());
        let engine = Arc::new(engine_with(provider.clone(), storage.clone()));

        let mut rx = engine.chat_stream(sid("s"), "roast me");
        assert_eq!(rx.recv().await.as_deref(), Some("one "));
        drop(rx);
        provider.release();

        // The session lock is released once the task notices
        let history = engine.history(&sid("s")).await;
        assert!(history.is_empty());
        assert_eq!(storage.total_turns().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stream_validates_input() {
        let provider = Arc::new(ScriptedProvider::replies(&[]));
        let engine = Arc::new(engine_with(provider.clone(), Arc::new(InMemoryStorage::new())));
        let parts = recv_all(engine.chat_stream(sid("s"), "  ")).await;
        assert_eq!(parts, vec![EMPTY_INPUT_REPLY.to_string()]);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_turns_in_one_session_are_serialized() {
        let replies: Vec<String> = (0..8).map(|i| format!("r{i}")).collect();
        let refs: Vec<&str> = replies.iter().map(String::as_str).collect();
        let provider = Arc::new(ScriptedProvider::replies(&refs));
        let engine = Arc::new(engine_with(provider, Arc::new(InMemoryStorage::new())));

        let mut handles = Vec::new();
        for i in 0..8 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine.chat(&sid("s"), &format!("turn {i} please")).await
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let history = engine.history(&sid("s")).await;
        assert_eq!(history.len(), 16);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role(), Role::User);
            assert_eq!(pair[1].role(), Role::Assistant);
        }
    }
}
