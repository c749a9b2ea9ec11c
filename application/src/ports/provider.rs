//! Provider port
//!
//! Defines the request/response contract every LLM vendor adapter implements,
//! and the registry the orchestrator resolves phase providers from.

use alchemy_domain::ProviderId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Request sent to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Text returned by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub text: String,
    pub tokens_used: u32,
}

impl ProviderResponse {
    pub fn new(text: impl Into<String>, tokens_used: u32) -> Self {
        Self {
            text: text.into(),
            tokens_used,
        }
    }
}

/// Classification of provider failures, used by the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    RateLimited,
    Timeout,
    Network,
    Auth,
    Invalid,
    /// The call was abandoned because the run was cancelled or hit its deadline
    Cancelled,
}

impl ProviderErrorKind {
    /// Whether another attempt may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::RateLimited | ProviderErrorKind::Timeout | ProviderErrorKind::Network
        )
    }

    /// Outcome label for metrics; cancellations count as timeouts.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            ProviderErrorKind::RateLimited => "rate_limited",
            ProviderErrorKind::Timeout | ProviderErrorKind::Cancelled => "timeout",
            ProviderErrorKind::Network => "network",
            ProviderErrorKind::Auth => "auth",
            ProviderErrorKind::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderErrorKind::RateLimited => "rate limited",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::Network => "network",
            ProviderErrorKind::Auth => "authentication",
            ProviderErrorKind::Invalid => "invalid request",
            ProviderErrorKind::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Error returned by a provider call
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Provider error ({kind}): {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Network, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Auth, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Invalid, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ProviderErrorKind::Cancelled, "operation cancelled")
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ProviderErrorKind::Cancelled
    }
}

/// An LLM vendor adapter
///
/// Implementations live in the infrastructure layer. Dropping the returned
/// future abandons the call; callers rely on this for cancellation.
#[async_trait]
pub trait ProviderPort: Send + Sync {
    /// Send one request and wait for the complete response
    async fn invoke(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}

/// Registered providers, keyed by id
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn ProviderPort>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, id: impl Into<ProviderId>, provider: Arc<dyn ProviderPort>) -> Self {
        self.providers.insert(id.into(), provider);
        self
    }

    pub fn get(&self, id: &ProviderId) -> Option<Arc<dyn ProviderPort>> {
        self.providers.get(id).cloned()
    }

    pub fn contains(&self, id: &ProviderId) -> bool {
        self.providers.contains_key(id)
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<ProviderId> {
        let mut ids: Vec<_> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl ProviderPort for Echo {
        async fn invoke(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse::new(request.prompt.clone(), 1))
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(ProviderErrorKind::RateLimited.is_transient());
        assert!(ProviderErrorKind::Timeout.is_transient());
        assert!(ProviderErrorKind::Network.is_transient());
        assert!(!ProviderErrorKind::Auth.is_transient());
        assert!(!ProviderErrorKind::Invalid.is_transient());
        assert!(!ProviderErrorKind::Cancelled.is_transient());
    }

    #[test]
    fn test_cancelled_counts_as_timeout() {
        assert_eq!(ProviderErrorKind::Cancelled.outcome_label(), "timeout");
        assert!(ProviderError::cancelled().is_cancelled());
    }

    #[test]
    fn test_error_display() {
        let error = ProviderError::auth("bad key");
        assert_eq!(error.to_string(), "Provider error (authentication): bad key");
    }

    #[tokio::test]
    async fn test_registry_lookup() {
        let registry = ProviderRegistry::new()
            .register("openai", Arc::new(Echo))
            .register("ollama", Arc::new(Echo));
        assert!(registry.contains(&ProviderId::new("ollama")));
        assert!(!registry.contains(&ProviderId::new("grok")));
        assert_eq!(
            registry.ids(),
            vec![ProviderId::new("ollama"), ProviderId::new("openai")]
        );

        let provider = registry.get(&ProviderId::new("openai")).unwrap();
        let request = ProviderRequest {
            prompt: "hi".to_string(),
            model: "m".to_string(),
            temperature: 0.7,
            max_tokens: 10,
        };
        assert_eq!(provider.invoke(&request).await.unwrap().text, "hi");
    }
}
