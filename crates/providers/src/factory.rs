//! Provider construction from configuration.

use std::sync::Arc;
use std::time::Duration;

use agentchat_config::AppConfig;
use agentchat_core::error::ProviderError;
use agentchat_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the configured completion provider.
///
/// Every supported backend speaks the OpenAI-compatible protocol; the
/// provider name only selects the default base URL. Local backends
/// (`ollama`, `vllm`, `llamacpp`) do not require an API key.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.provider.as_str();

    let api_key = match (&config.api_key, is_local(name)) {
        (Some(key), _) => key.clone(),
        (None, true) => name.to_string(),
        (None, false) => {
            return Err(ProviderError::NotConfigured(format!(
                "No API key for provider '{name}'. Set OPENAI_API_KEY or api_key in config.toml"
            )));
        }
    };

    let base_url = config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(name));

    let timeout = config.request_timeout_secs.map(Duration::from_secs);

    tracing::debug!(provider = name, base_url = %base_url, ?timeout, "Building provider");

    let provider = OpenAiCompatProvider::new(name, base_url, api_key, timeout)?;
    Ok(Arc::new(provider))
}

/// Local backends run without credentials.
pub fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
        assert!(default_base_url("something-else").contains("api.openai.com"));
    }

    #[test]
    fn build_requires_api_key_for_hosted_provider() {
        let config = AppConfig::default();
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn build_with_api_key() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            request_timeout_secs: Some(30),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn local_backends() {
        assert!(is_local("ollama"));
        assert!(is_local("llama.cpp"));
        assert!(!is_local("openai"));
    }

    #[test]
    fn local_provider_needs_no_key() {
        let config = AppConfig {
            provider: "ollama".into(),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }
}
