//! Generation request value object

use crate::core::error::DomainError;
use crate::phase::PhaseId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of ranked results
pub const DEFAULT_COUNT: usize = 3;

/// A request to generate prompts (Value Object)
///
/// Owned by exactly one orchestrator run and never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    input: String,
    session_id: String,
    phases: Vec<PhaseId>,
    persona: Option<String>,
    tags: Vec<String>,
    count: usize,
    /// Time budget for the whole run, measured from when the run starts
    deadline: Option<Duration>,
}

impl GenerationRequest {
    /// Creates a request with a fresh session id and the default phase sequence.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            session_id: uuid::Uuid::new_v4().to_string(),
            phases: PhaseId::default_sequence(),
            persona: None,
            tags: Vec::new(),
            count: DEFAULT_COUNT,
            deadline: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_phases(mut self, phases: Vec<PhaseId>) -> Self {
        self.phases = phases;
        self
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn phases(&self) -> &[PhaseId] {
        &self.phases
    }

    pub fn persona(&self) -> Option<&str> {
        self.persona.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Validate the request contents (the phase sequence is checked by the
    /// orchestrator against its provider configuration).
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.input.trim().is_empty() {
            return Err(DomainError::InvalidRequest("input cannot be empty".to_string()));
        }
        if self.count == 0 {
            return Err(DomainError::InvalidRequest("count must be at least 1".to_string()));
        }
        if self.deadline.is_some_and(|d| d.is_zero()) {
            return Err(DomainError::InvalidRequest("deadline cannot be zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = GenerationRequest::new("write a function");
        assert_eq!(request.phases(), PhaseId::default_sequence().as_slice());
        assert_eq!(request.count(), DEFAULT_COUNT);
        assert!(request.deadline().is_none());
        assert!(!request.session_id().is_empty());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let request = GenerationRequest::new("write a function")
            .with_session_id("s-1")
            .with_phases(vec![PhaseId::PrimaMateria])
            .with_persona("code")
            .with_tags(vec!["rust".to_string()])
            .with_count(5)
            .with_deadline(Duration::from_secs(30));
        assert_eq!(request.session_id(), "s-1");
        assert_eq!(request.persona(), Some("code"));
        assert_eq!(request.tags(), ["rust".to_string()]);
        assert_eq!(request.count(), 5);
        assert_eq!(request.deadline(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_validate_rejects_blank_input_and_zero_count() {
        assert!(GenerationRequest::new("   ").validate().is_err());
        assert!(GenerationRequest::new("x").with_count(0).validate().is_err());
        assert!(
            GenerationRequest::new("x")
                .with_deadline(Duration::ZERO)
                .validate()
                .is_err()
        );
    }
}
