//! OpenAI-compatible chat completions adapter

use super::http::{join_url, send_json};
use alchemy_application::{ProviderError, ProviderPort, ProviderRequest, ProviderResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    api_key_env: Option<String>,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: None,
            api_key_env: None,
        }
    }

    /// Read the bearer key from `env_var` once, at construction.
    pub fn with_api_key_env(mut self, env_var: impl Into<String>) -> Self {
        let env_var = env_var.into();
        self.api_key = std::env::var(&env_var).ok().filter(|k| !k.trim().is_empty());
        self.api_key_env = Some(env_var);
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[async_trait]
impl ProviderPort for OpenAiProvider {
    async fn invoke(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut builder = self
            .client
            .post(join_url(&self.base_url, "v1/chat/completions"))
            .json(&ChatRequest {
                model: &request.model,
                messages: [ChatMessage {
                    role: "user",
                    content: &request.prompt,
                }],
                temperature: request.temperature,
                max_tokens: request.max_tokens,
            });

        match (&self.api_key, &self.api_key_env) {
            (Some(key), _) => builder = builder.bearer_auth(key),
            (None, Some(env_var)) => {
                return Err(ProviderError::auth(format!(
                    "API key not set (expected in ${})",
                    env_var
                )));
            }
            (None, None) => {}
        }
        debug!("Chat completion with {}", request.model);

        let response: ChatResponse = send_json(builder).await?;
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::invalid("response contained no choices"))?;

        Ok(ProviderResponse::new(
            text,
            response.usage.map(|u| u.total_tokens).unwrap_or(0),
        ))
    }
}
