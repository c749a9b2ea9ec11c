//! Port for structured pipeline events.
//!
//! Defines the [`ObservabilitySink`] trait for recording provider requests,
//! phase outcomes and ranking passes to a machine-readable stream.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures one record
//! per event for later analysis (JSONL).

use alchemy_domain::{PhaseId, ProviderId};
use serde::Serialize;
use std::time::Duration;

/// Kind of pipeline event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ProviderRequest,
    PhaseOutcome,
    RankingPass,
    Retrain,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ProviderRequest => "provider_request",
            EventType::PhaseOutcome => "phase_outcome",
            EventType::RankingPass => "ranking_pass",
            EventType::Retrain => "retrain",
        }
    }
}

/// A single observability record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservabilityEvent {
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<PhaseId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,
    pub duration_ms: u64,
    pub tokens: u32,
    pub outcome: String,
}

impl ObservabilityEvent {
    pub fn new(event_type: EventType, outcome: impl Into<String>) -> Self {
        Self {
            event_type,
            phase: None,
            provider: None,
            duration_ms: 0,
            tokens: 0,
            outcome: outcome.into(),
        }
    }

    pub fn provider_request(phase: PhaseId, provider: ProviderId, outcome: impl Into<String>) -> Self {
        Self::new(EventType::ProviderRequest, outcome)
            .with_phase(phase)
            .with_provider(provider)
    }

    pub fn with_phase(mut self, phase: PhaseId) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.tokens = tokens;
        self
    }
}

/// Port for emitting observability events.
///
/// `emit` is synchronous and non-fallible. Implementations must not block
/// the caller; a sink that cannot keep up drops events.
pub trait ObservabilitySink: Send + Sync {
    /// Record an event.
    fn emit(&self, event: ObservabilityEvent);
}

/// No-op implementation for tests and when event logging is disabled.
pub struct NoObservability;

impl ObservabilitySink for NoObservability {
    fn emit(&self, _event: ObservabilityEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_flat() {
        let event = ObservabilityEvent::provider_request(
            PhaseId::Solutio,
            ProviderId::new("openai"),
            "success",
        )
        .with_duration(Duration::from_millis(1500))
        .with_tokens(42);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "provider_request");
        assert_eq!(json["phase"], "solutio");
        assert_eq!(json["provider"], "openai");
        assert_eq!(json["duration_ms"], 1500);
        assert_eq!(json["tokens"], 42);
        assert_eq!(json["outcome"], "success");
    }

    #[test]
    fn test_optional_fields_omitted() {
        let event = ObservabilityEvent::new(EventType::RankingPass, "3 selected");
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("phase").is_none());
        assert!(json.get("provider").is_none());
    }
}
