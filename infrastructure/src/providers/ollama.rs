//! Ollama adapter (`/api/generate`, `/api/embeddings`)

use super::http::{join_url, send_json};
use alchemy_application::{
    EmbeddingPort, ProviderError, ProviderPort, ProviderRequest, ProviderResponse,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Non-streaming text generation against an Ollama server
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ProviderPort for OllamaProvider {
    async fn invoke(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let body = GenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };
        debug!("Ollama generate with {}", request.model);

        let response: GenerateResponse = send_json(
            self.client
                .post(join_url(&self.base_url, "api/generate"))
                .json(&body),
        )
        .await?;

        let tokens = response.prompt_eval_count.unwrap_or(0) + response.eval_count.unwrap_or(0);
        Ok(ProviderResponse::new(response.response, tokens))
    }
}

/// Embeddings from an Ollama server
pub struct OllamaEmbedding {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedding {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl EmbeddingPort for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };
        let response: EmbeddingResponse = send_json(
            self.client
                .post(join_url(&self.base_url, "api/embeddings"))
                .json(&body),
        )
        .await?;

        if response.embedding.is_empty() {
            return Err(ProviderError::invalid("empty embedding"));
        }
        Ok(response.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::http::test_server::serve_once;
    use alchemy_application::ProviderErrorKind;

    fn request() -> ProviderRequest {
        ProviderRequest {
            prompt: "Refine this".to_string(),
            model: "llama3".to_string(),
            temperature: 0.4,
            max_tokens: 256,
        }
    }

    #[tokio::test]
    async fn test_generate_success() {
        let (base_url, raw) = serve_once(
            200,
            r#"{"model":"llama3","response":"A refined prompt","done":true,"prompt_eval_count":12,"eval_count":30}"#,
        )
        .await;
        let provider = OllamaProvider::new(reqwest::Client::new(), base_url);

        let response = provider.invoke(&request()).await.unwrap();
        assert_eq!(response.text, "A refined prompt");
        assert_eq!(response.tokens_used, 42);

        let raw = raw.await.unwrap();
        assert!(raw.starts_with("POST /api/generate"));
        assert!(raw.contains(r#""stream":false"#));
        assert!(raw.contains(r#""num_predict":256"#));
    }

    #[tokio::test]
    async fn test_generate_without_token_counts() {
        let (base_url, _raw) = serve_once(200, r#"{"response":"text"}"#).await;
        let provider = OllamaProvider::new(reqwest::Client::new(), base_url);
        assert_eq!(provider.invoke(&request()).await.unwrap().tokens_used, 0);
    }

    #[tokio::test]
    async fn test_model_not_found_is_invalid() {
        let (base_url, _raw) = serve_once(404, r#"{"error":"model 'llama3' not found"}"#).await;
        let provider = OllamaProvider::new(reqwest::Client::new(), base_url);

        let error = provider.invoke(&request()).await.unwrap_err();
        assert_eq!(error.kind, ProviderErrorKind::Invalid);
        assert!(error.message.contains("not found"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network() {
        // bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider = OllamaProvider::new(reqwest::Client::new(), format!("http://{}", addr));
        let error = provider.invoke(&request()).await.unwrap_err();
        assert_eq!(error.kind, ProviderErrorKind::Network);
    }

    #[tokio::test]
    async fn test_embedding() {
        let (base_url, raw) = serve_once(200, r#"{"embedding":[0.1,0.2,0.3]}"#).await;
        let embedding = OllamaEmbedding::new(reqwest::Client::new(), base_url, "nomic-embed-text");

        let vector = embedding.embed("hello").await.unwrap();
        assert_eq!(vector.len(), 3);
        assert!(raw.await.unwrap().starts_with("POST /api/embeddings"));
    }
}
