//! Provider construction — selects the LLM backend from config.

use std::sync::Arc;
use codewright_config::{AppConfig, ConfigError};
use codewright_core::provider::Provider;
use tracing::info;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the configured provider.
///
/// Fails before any conversation starts when a remote provider has no key.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ConfigError> {
    let api_key = config.require_api_key()?.unwrap_or_default();

    let base_url = match &config.api_url {
        Some(url) => url.clone(),
        None => default_base_url(&config.provider).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "unknown provider '{}' (expected openai, openrouter, ollama, or custom)",
                config.provider
            ))
        })?,
    };

    info!(provider = %config.provider, base_url = %base_url, model = %config.model, "Using provider");

    Ok(Arc::new(OpenAiCompatProvider::new(
        &config.provider,
        base_url,
        api_key,
    )))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> Option<String> {
    match provider_name {
        "openrouter" => Some("https://openrouter.ai/api/v1".into()),
        "openai" => Some("https://api.openai.com/v1".into()),
        "ollama" => Some("http://localhost:11434/v1".into()),
        "vllm" => Some("http://localhost:8000/v1".into()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").unwrap().contains("openrouter.ai"));
        assert!(default_base_url("openai").unwrap().contains("api.openai.com"));
        assert!(default_base_url("ollama").unwrap().contains("localhost:11434"));
        assert!(default_base_url("nope").is_none());
    }

    #[test]
    fn remote_provider_without_key_fails() {
        let config = AppConfig::default();
        assert!(matches!(
            build_from_config(&config),
            Err(ConfigError::MissingCredentials { .. })
        ));
    }

    #[test]
    fn ollama_builds_without_key() {
        let config = AppConfig {
            provider: "ollama".into(),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn custom_provider_uses_api_url() {
        let config = AppConfig {
            provider: "custom".into(),
            api_url: Some("http://localhost:9999/v1".into()),
            ..AppConfig::default()
        };
        assert_eq!(build_from_config(&config).unwrap().name(), "custom");
    }

    #[test]
    fn unknown_provider_rejected() {
        let config = AppConfig {
            provider: "mystery".into(),
            api_key: Some("k".into()),
            ..AppConfig::default()
        };
        assert!(matches!(
            build_from_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
