//! Execute Phase use case
//!
//! Runs one provider call for one phase: render the prompt, invoke the
//! provider under the retry policy, and wrap the response as a candidate.
//! The orchestrator fans these calls out; the executor itself knows nothing
//! about sibling calls or the overall pipeline.

use crate::config::RetryPolicy;
use crate::ports::observability::{ObservabilityEvent, ObservabilitySink};
use crate::ports::provider::{ProviderError, ProviderRegistry, ProviderRequest, ProviderResponse};
use crate::ports::template_renderer::{TemplateError, TemplateRenderer};
use alchemy_domain::{Candidate, GenerationRequest, PhaseConfig, PhaseId, PromptVariables, ProviderId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors from a single phase call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhaseError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Provider {0} is not registered")]
    UnknownProvider(ProviderId),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl PhaseError {
    /// Outcome label recorded for this failure
    pub fn outcome_label(&self) -> &'static str {
        match self {
            PhaseError::Template(TemplateError::NotFound(_)) => "template_not_found",
            PhaseError::Template(_) => "template_error",
            PhaseError::UnknownProvider(_) => "unknown_provider",
            PhaseError::Provider(e) => e.kind.outcome_label(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PhaseError::Provider(e) if e.is_cancelled())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    phase: PhaseId,
    provider: ProviderId,
    model: String,
    temperature_bits: u64,
    max_tokens: u32,
    prompt: String,
}

impl CacheKey {
    fn new(config: &PhaseConfig, prompt: &str) -> Self {
        Self {
            phase: config.phase,
            provider: config.provider.clone(),
            model: config.model.clone(),
            temperature_bits: config.temperature.to_bits(),
            max_tokens: config.max_tokens,
            prompt: prompt.to_string(),
        }
    }
}

/// Memoized successful provider responses
#[derive(Default)]
struct ResponseCache {
    entries: Mutex<HashMap<CacheKey, ProviderResponse>>,
}

impl ResponseCache {
    fn get(&self, key: &CacheKey) -> Option<ProviderResponse> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn put(&self, key: CacheKey, response: ProviderResponse) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, response);
        }
    }
}

/// Executes single phase calls against registered providers
pub struct PhaseExecutor {
    registry: Arc<ProviderRegistry>,
    renderer: Arc<dyn TemplateRenderer>,
    sink: Arc<dyn ObservabilitySink>,
    retry: RetryPolicy,
    cache: Option<ResponseCache>,
}

impl PhaseExecutor {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        renderer: Arc<dyn TemplateRenderer>,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self {
            registry,
            renderer,
            sink,
            retry: RetryPolicy::default(),
            cache: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Memoize successful responses for identical calls
    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(ResponseCache::default);
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Build the variables a phase template is rendered with.
    pub fn variables_for(
        phase: PhaseId,
        request: &GenerationRequest,
        parent: Option<&Candidate>,
    ) -> PromptVariables {
        let vars = PromptVariables::new(phase, request.input())
            .with_persona(request.persona().map(str::to_string))
            .with_context(request.tags().to_vec());
        match parent {
            Some(parent) => vars.with_prompt(parent.text.clone()),
            None => vars,
        }
    }

    /// Run one call for `config`.
    ///
    /// `parent` is the prior-phase candidate being refined; `None` means the
    /// phase works from the raw request input.
    pub async fn execute(
        &self,
        config: &PhaseConfig,
        request: &GenerationRequest,
        parent: Option<&Candidate>,
        attempt_timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Candidate, PhaseError> {
        let vars = Self::variables_for(config.phase, request, parent);
        let prompt = self.renderer.render(&vars).inspect_err(|e| {
            warn!("Phase {} skipped: {}", config.phase, e);
            self.emit(config, Duration::ZERO, 0, PhaseError::Template(e.clone()).outcome_label());
        })?;

        let provider = self
            .registry
            .get(&config.provider)
            .ok_or_else(|| PhaseError::UnknownProvider(config.provider.clone()))?;

        let key = CacheKey::new(config, &prompt);
        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            debug!("Cache hit for {} / {}", config.phase, config.provider);
            self.emit(config, Duration::ZERO, cached.tokens_used, "cached");
            return Ok(self.candidate(config, parent, cached, Duration::ZERO));
        }

        let provider_request = ProviderRequest {
            prompt,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        let started = Instant::now();
        let result = self
            .retry
            .execute(cancel, attempt_timeout, || provider.invoke(&provider_request))
            .await
            .and_then(|response| {
                if response.text.trim().is_empty() {
                    Err(ProviderError::invalid("provider returned an empty response"))
                } else {
                    Ok(response)
                }
            });
        let elapsed = started.elapsed();

        match result {
            Ok(response) => {
                info!(
                    "{} via {} ({}) responded in {}ms",
                    config.phase,
                    config.provider,
                    config.model,
                    elapsed.as_millis()
                );
                self.emit(config, elapsed, response.tokens_used, "success");
                if let Some(cache) = &self.cache {
                    cache.put(key, response.clone());
                }
                Ok(self.candidate(config, parent, response, elapsed))
            }
            Err(error) => {
                warn!("{} via {} failed: {}", config.phase, config.provider, error);
                self.emit(config, elapsed, 0, error.kind.outcome_label());
                Err(PhaseError::Provider(error))
            }
        }
    }

    fn candidate(
        &self,
        config: &PhaseConfig,
        parent: Option<&Candidate>,
        response: ProviderResponse,
        latency: Duration,
    ) -> Candidate {
        let candidate = Candidate::new(
            config.phase,
            config.provider.clone(),
            config.model.clone(),
            response.text.trim(),
        )
        .with_usage(response.tokens_used, latency);
        match parent {
            Some(parent) => candidate.with_parent(parent.id),
            None => candidate,
        }
    }

    fn emit(&self, config: &PhaseConfig, duration: Duration, tokens: u32, outcome: &str) {
        self.sink.emit(
            ObservabilityEvent::provider_request(config.phase, config.provider.clone(), outcome)
                .with_duration(duration)
                .with_tokens(tokens),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::observability::EventType;
    use crate::ports::provider::{ProviderErrorKind, ProviderPort};
    use crate::ports::template_renderer::BuiltinTemplates;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        calls: AtomicUsize,
        fail_first: usize,
        error: ProviderError,
    }

    impl ScriptedProvider {
        fn ok() -> Self {
            Self::failing(0, ProviderError::network("unused"))
        }

        fn failing(fail_first: usize, error: ProviderError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first,
                error,
            }
        }
    }

    #[async_trait]
    impl ProviderPort for ScriptedProvider {
        async fn invoke(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(self.error.clone());
            }
            Ok(ProviderResponse::new(
                format!("  refined by {} at {}  ", request.model, request.temperature),
                17,
            ))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<ObservabilityEvent>>,
    }

    impl ObservabilitySink for RecordingSink {
        fn emit(&self, event: ObservabilityEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct MissingTemplates;

    impl TemplateRenderer for MissingTemplates {
        fn render(&self, vars: &PromptVariables) -> Result<String, TemplateError> {
            Err(TemplateError::NotFound(vars.phase))
        }
    }

    fn executor(provider: Arc<ScriptedProvider>, sink: Arc<RecordingSink>) -> PhaseExecutor {
        let registry = ProviderRegistry::new().register("mock", provider);
        PhaseExecutor::new(Arc::new(registry), Arc::new(BuiltinTemplates), sink)
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1)))
    }

    fn config(phase: PhaseId) -> PhaseConfig {
        PhaseConfig::new(phase, "mock", "test-model")
    }

    #[tokio::test]
    async fn test_execute_produces_candidate() {
        let sink = Arc::new(RecordingSink::default());
        let executor = executor(Arc::new(ScriptedProvider::ok()), sink.clone());
        let request = GenerationRequest::new("write a haiku");

        let candidate = executor
            .execute(
                &config(PhaseId::PrimaMateria),
                &request,
                None,
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(candidate.phase, PhaseId::PrimaMateria);
        assert_eq!(candidate.provider, ProviderId::new("mock"));
        assert_eq!(candidate.text, "refined by test-model at 0.7");
        assert_eq!(candidate.tokens_used, 17);
        assert!(candidate.parent.is_none());

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::ProviderRequest);
        assert_eq!(events[0].outcome, "success");
        assert_eq!(events[0].tokens, 17);
    }

    #[tokio::test]
    async fn test_execute_links_parent() {
        let sink = Arc::new(RecordingSink::default());
        let executor = executor(Arc::new(ScriptedProvider::ok()), sink);
        let request = GenerationRequest::new("write a haiku");
        let parent = Candidate::new(PhaseId::PrimaMateria, "mock".into(), "m", "draft");

        let candidate = executor
            .execute(
                &config(PhaseId::Solutio),
                &request,
                Some(&parent),
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(candidate.parent, Some(parent.id));
    }

    #[test]
    fn test_variables_use_parent_text() {
        let request = GenerationRequest::new("raw idea")
            .with_persona("a poet")
            .with_tags(vec!["short".to_string()]);
        let parent = Candidate::new(PhaseId::PrimaMateria, "mock".into(), "m", "draft text");

        let vars = PhaseExecutor::variables_for(PhaseId::Solutio, &request, Some(&parent));
        assert_eq!(vars.input, "raw idea");
        assert_eq!(vars.prompt.as_deref(), Some("draft text"));
        assert_eq!(vars.persona.as_deref(), Some("a poet"));
        assert_eq!(vars.context, vec!["short".to_string()]);
    }

    #[tokio::test]
    async fn test_transient_failure_recovers() {
        let provider = Arc::new(ScriptedProvider::failing(2, ProviderError::timeout("slow")));
        let sink = Arc::new(RecordingSink::default());
        let executor = executor(provider.clone(), sink);

        let result = executor
            .execute(
                &config(PhaseId::PrimaMateria),
                &GenerationRequest::new("x"),
                None,
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_failure_not_retried() {
        let provider = Arc::new(ScriptedProvider::failing(5, ProviderError::auth("no key")));
        let sink = Arc::new(RecordingSink::default());
        let executor = executor(provider.clone(), sink.clone());

        let error = executor
            .execute(
                &config(PhaseId::PrimaMateria),
                &GenerationRequest::new("x"),
                None,
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(error, PhaseError::Provider(ref e) if e.kind == ProviderErrorKind::Auth));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.events.lock().unwrap()[0].outcome, "auth");
    }

    #[tokio::test]
    async fn test_missing_template_skips_call() {
        let provider = Arc::new(ScriptedProvider::ok());
        let registry = ProviderRegistry::new().register("mock", provider.clone());
        let executor = PhaseExecutor::new(
            Arc::new(registry),
            Arc::new(MissingTemplates),
            Arc::new(RecordingSink::default()),
        );

        let error = executor
            .execute(
                &config(PhaseId::Coagulatio),
                &GenerationRequest::new("x"),
                None,
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(error, PhaseError::Template(TemplateError::NotFound(PhaseId::Coagulatio)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let executor = executor(
            Arc::new(ScriptedProvider::ok()),
            Arc::new(RecordingSink::default()),
        );
        let error = executor
            .execute(
                &PhaseConfig::new(PhaseId::Solutio, "nowhere", "m"),
                &GenerationRequest::new("x"),
                None,
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(error, PhaseError::UnknownProvider(ProviderId::new("nowhere")));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let provider = Arc::new(ScriptedProvider::ok());
        let sink = Arc::new(RecordingSink::default());
        let executor = executor(provider.clone(), sink.clone()).with_caching(true);
        let request = GenerationRequest::new("same input");

        let first = executor
            .execute(
                &config(PhaseId::PrimaMateria),
                &request,
                None,
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        let second = executor
            .execute(
                &config(PhaseId::PrimaMateria),
                &request,
                None,
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.text, second.text);
        assert_ne!(first.id, second.id);
        assert_eq!(second.latency_ms, 0);

        let events = sink.events.lock().unwrap();
        assert_eq!(events[1].outcome, "cached");
    }

    #[tokio::test]
    async fn test_cache_distinguishes_temperature() {
        let provider = Arc::new(ScriptedProvider::ok());
        let executor = executor(provider.clone(), Arc::new(RecordingSink::default()))
            .with_caching(true);
        let request = GenerationRequest::new("same input");

        for temperature in [0.2, 0.9] {
            executor
                .execute(
                    &config(PhaseId::PrimaMateria).with_temperature(temperature),
                    &request,
                    None,
                    Duration::from_secs(1),
                    &CancellationToken::new(),
                )
                .await
                .unwrap();
        }

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
