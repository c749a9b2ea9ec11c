//! Provider configuration from TOML (`[providers.<id>]` sections)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire protocol spoken by a provider endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    /// Any OpenAI-compatible chat completions endpoint
    #[serde(alias = "openai-compatible")]
    OpenAi,
}

/// One provider endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProviderConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    /// Environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Model used for embeddings (Ollama only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

fn default_timeout_seconds() -> u64 {
    120
}

impl FileProviderConfig {
    pub fn ollama() -> Self {
        Self {
            kind: ProviderKind::Ollama,
            base_url: "http://localhost:11434".to_string(),
            api_key_env: None,
            timeout_seconds: default_timeout_seconds(),
            embedding_model: Some("nomic-embed-text".to_string()),
        }
    }

    pub fn openai() -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            base_url: "https://api.openai.com".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            timeout_seconds: default_timeout_seconds(),
            embedding_model: None,
        }
    }
}

/// Provider endpoints, keyed by provider id
pub type FileProvidersConfig = BTreeMap<String, FileProviderConfig>;

pub(crate) fn default_providers() -> FileProvidersConfig {
    let mut providers = BTreeMap::new();
    providers.insert("ollama".to_string(), FileProviderConfig::ollama());
    providers
}
