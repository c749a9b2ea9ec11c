//! LLM provider adapters
//!
//! Builds the [`ProviderRegistry`] and optional embedding port from the
//! `[providers.<id>]` configuration.

mod http;
mod ollama;
mod openai;

pub use http::{classify_status, classify_transport};
pub use ollama::{OllamaEmbedding, OllamaProvider};
pub use openai::OpenAiProvider;

use crate::config::{FileProviderConfig, FileProvidersConfig, ProviderKind};
use alchemy_application::{EmbeddingPort, ProviderPort, ProviderRegistry};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ProviderSetupError {
    #[error("Failed to build HTTP client for provider {provider}: {source}")]
    Client {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Embedding provider {0} is not configured or is not an ollama provider")]
    Embedding(String),
}

fn http_client(id: &str, config: &FileProviderConfig) -> Result<reqwest::Client, ProviderSetupError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(|source| ProviderSetupError::Client {
            provider: id.to_string(),
            source,
        })
}

/// Build an adapter for one configured provider
pub fn build_provider(
    id: &str,
    config: &FileProviderConfig,
) -> Result<Arc<dyn ProviderPort>, ProviderSetupError> {
    let client = http_client(id, config)?;
    let provider: Arc<dyn ProviderPort> = match config.kind {
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(client, config.base_url.clone())),
        ProviderKind::OpenAi => {
            let adapter = OpenAiProvider::new(client, config.base_url.clone());
            match &config.api_key_env {
                Some(env_var) => Arc::new(adapter.with_api_key_env(env_var.clone())),
                None => Arc::new(adapter),
            }
        }
    };
    debug!("Registered provider {} ({:?}) at {}", id, config.kind, config.base_url);
    Ok(provider)
}

/// Build the registry of every configured provider
pub fn build_registry(providers: &FileProvidersConfig) -> Result<ProviderRegistry, ProviderSetupError> {
    let mut registry = ProviderRegistry::new();
    for (id, config) in providers {
        registry = registry.register(id.as_str(), build_provider(id, config)?);
    }
    Ok(registry)
}

/// Build the embedding port for `provider_id`
pub fn build_embedding(
    providers: &FileProvidersConfig,
    provider_id: &str,
) -> Result<Arc<dyn EmbeddingPort>, ProviderSetupError> {
    let config = providers
        .get(provider_id)
        .filter(|c| c.kind == ProviderKind::Ollama)
        .ok_or_else(|| ProviderSetupError::Embedding(provider_id.to_string()))?;
    let model = config
        .embedding_model
        .clone()
        .unwrap_or_else(|| "nomic-embed-text".to_string());

    Ok(Arc::new(OllamaEmbedding::new(
        http_client(provider_id, config)?,
        config.base_url.clone(),
        model,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alchemy_domain::ProviderId;
    use std::collections::BTreeMap;

    #[test]
    fn test_build_registry_from_config() {
        let mut providers = BTreeMap::new();
        providers.insert("local".to_string(), FileProviderConfig::ollama());
        providers.insert("openai".to_string(), FileProviderConfig::openai());

        let registry = build_registry(&providers).unwrap();
        assert_eq!(
            registry.ids(),
            vec![ProviderId::new("local"), ProviderId::new("openai")]
        );
    }

    #[test]
    fn test_embedding_requires_ollama() {
        let mut providers = BTreeMap::new();
        providers.insert("local".to_string(), FileProviderConfig::ollama());
        providers.insert("openai".to_string(), FileProviderConfig::openai());

        assert!(build_embedding(&providers, "local").is_ok());
        assert!(matches!(
            build_embedding(&providers, "openai"),
            Err(ProviderSetupError::Embedding(_))
        ));
        assert!(build_embedding(&providers, "missing").is_err());
    }
}
