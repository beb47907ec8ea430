//! Provider selection from configuration.

use std::sync::Arc;

use emberbot_config::AppConfig;
use emberbot_core::error::ProviderError;
use emberbot_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the completion provider named in the configuration.
///
/// Fails with `NotConfigured` when a hosted provider has no API key.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.provider.as_str();
    let base_url = config
        .api_url
        .clone()
        .or_else(|| default_base_url(name).map(String::from))
        .ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider '{name}'; set api_url to use a custom endpoint"
            ))
        })?;

    let api_key = match (&config.api_key, requires_key(name)) {
        (Some(key), _) => key.clone(),
        (None, false) => String::new(),
        (None, true) => {
            return Err(ProviderError::NotConfigured(format!(
                "No API key for '{name}'. Set GROQ_KEY or run `emberbot onboard`"
            )));
        }
    };

    tracing::debug!(provider = name, base_url = %base_url, "Building provider");
    Ok(Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "groq" => Some("https://api.groq.com/openai/v1"),
        "openai" => Some("https://api.openai.com/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "together" => Some("https://api.together.xyz/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        "llamacpp" | "llama.cpp" => Some("http://localhost:8080/v1"),
        _ => None,
    }
}

/// Whether talking to `provider_name` needs an API key.
pub fn requires_key(provider_name: &str) -> bool {
    !matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_urls() {
        assert_eq!(
            default_base_url("groq"),
            Some("https://api.groq.com/openai/v1")
        );
        assert!(default_base_url("openai").unwrap().contains("api.openai.com"));
        assert!(default_base_url("nonexistent").is_none());
    }

    #[test]
    fn build_without_key_fails_for_hosted_provider() {
        let config = AppConfig::default();
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn build_with_key() {
        let config = AppConfig {
            api_key: Some("gsk-test".into()),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "groq");
    }

    #[test]
    fn local_endpoint_needs_no_key() {
        let config = AppConfig {
            provider: "ollama".into(),
            ..AppConfig::default()
        };
        assert!(build_from_config(&config).is_ok());
    }

    #[test]
    fn custom_provider_requires_url() {
        let mut config = AppConfig {
            provider: "mycorp".into(),
            api_key: Some("k".into()),
            ..AppConfig::default()
        };
        assert!(build_from_config(&config).is_err());
        config.api_url = Some("https://llm.mycorp.internal/v1".into());
        assert_eq!(build_from_config(&config).unwrap().name(), "mycorp");
    }
}
