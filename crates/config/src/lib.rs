//! Configuration loading, validation, and management for emberbot.
//!
//! Loads configuration from `~/.emberbot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.emberbot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Completion provider ("groq", "openai", "openrouter", "ollama")
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Override the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Completion model
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Persona used when none is given on the command line
    #[serde(default = "default_roast_mode")]
    pub roast_mode: String,

    /// Retrieval index configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Scored memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Durable storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_provider() -> String {
    "groq".into()
}
fn default_model() -> String {
    "llama-3.1-8b-instant".into()
}
fn default_temperature() -> f32 {
    0.8
}
fn default_max_tokens() -> u32 {
    512
}
fn default_roast_mode() -> String {
    "savage".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("roast_mode", &self.roast_mode)
            .field("retrieval", &self.retrieval)
            .field("memory", &self.memory)
            .field("storage", &self.storage)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Folder of `.txt` files to index (defaults to `~/.emberbot/data`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus_dir: Option<String>,

    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Chunks returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// "hashing", "provider", "local", or "none"
    #[serde(default = "default_embedding_backend")]
    pub embedding_backend: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimension for the hashing and placeholder vectors
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_chunk_size() -> usize {
    300
}
fn default_top_k() -> usize {
    3
}
fn default_embedding_backend() -> String {
    "hashing".into()
}
fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".into()
}
fn default_dimension() -> usize {
    384
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            corpus_dir: None,
            chunk_size: default_chunk_size(),
            top_k: default_top_k(),
            embedding_backend: default_embedding_backend(),
            embedding_model: default_embedding_model(),
            dimension: default_dimension(),
        }
    }
}

impl RetrievalConfig {
    /// Resolved corpus directory.
    pub fn corpus_path(&self) -> PathBuf {
        self.corpus_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("data"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Message pairs kept per session before the oldest are evicted
    #[serde(default = "default_max_pairs")]
    pub max_pairs: usize,

    /// Token budget for the history block of the prompt
    #[serde(default = "default_history_token_budget")]
    pub history_token_budget: usize,

    /// "approx" (words × 1.3) or "local" (HuggingFace tokenizer)
    #[serde(default = "default_tokenizer")]
    pub tokenizer: String,
}

fn default_max_pairs() -> usize {
    20
}
fn default_history_token_budget() -> usize {
    3000
}
fn default_tokenizer() -> String {
    "approx".into()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_pairs: default_max_pairs(),
            history_token_budget: default_history_token_budget(),
            tokenizer: default_tokenizer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "sqlite", "memory", or "none"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// SQLite file (defaults to `~/.emberbot/chat_history.db`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_storage_backend() -> String {
    "sqlite".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: None,
        }
    }
}

impl StorageConfig {
    /// Resolved database path.
    pub fn db_path(&self) -> PathBuf {
        self.path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("chat_history.db"))
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.emberbot/config.toml).
    ///
    /// Environment variables override the file:
    /// - `EMBERBOT_API_KEY`, `GROQ_KEY`, `GROQ_API_KEY`, `OPENAI_API_KEY` (first match wins)
    /// - `EMBERBOT_MODEL` or `MODEL_NAME`
    /// - `TEMPERATURE`
    /// - `MAX_TOKENS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`, then re-validate.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(key) = ["EMBERBOT_API_KEY", "GROQ_KEY", "GROQ_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .find_map(|k| lookup(k))
        {
            self.api_key = Some(key);
        }

        if let Some(model) = lookup("EMBERBOT_MODEL").or_else(|| lookup("MODEL_NAME")) {
            self.model = model;
        }

        if let Some(raw) = lookup("TEMPERATURE") {
            self.temperature = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("TEMPERATURE is not a number: {raw}"))
            })?;
        }

        if let Some(raw) = lookup("MAX_TOKENS") {
            self.max_tokens = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("MAX_TOKENS is not an integer: {raw}"))
            })?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".emberbot")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError("max_tokens must be > 0".into()));
        }
        if self.retrieval.chunk_size == 0 {
            return Err(ConfigError::ValidationError("retrieval.chunk_size must be > 0".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError("retrieval.top_k must be > 0".into()));
        }
        if self.retrieval.dimension == 0 {
            return Err(ConfigError::ValidationError("retrieval.dimension must be > 0".into()));
        }
        if self.memory.max_pairs == 0 {
            return Err(ConfigError::ValidationError("memory.max_pairs must be > 0".into()));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            roast_mode: default_roast_mode(),
            retrieval: RetrievalConfig::default(),
            memory: MemoryConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
