//! Phase domain entities

use crate::core::error::DomainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stage of the generation pipeline
///
/// The default sequence runs Prima Materia → Solutio → Coagulatio. Only
/// Prima Materia works from the raw input; the other phases refine the
/// candidates produced before them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhaseId {
    /// Idea generation - structures the raw input into a first prompt
    PrimaMateria,
    /// Humanization - dissolves the prompt into natural language
    Solutio,
    /// Precision - crystallizes the prompt into its final form
    Coagulatio,
}

impl PhaseId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseId::PrimaMateria => "prima-materia",
            PhaseId::Solutio => "solutio",
            PhaseId::Coagulatio => "coagulatio",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PhaseId::PrimaMateria => "Prima Materia",
            PhaseId::Solutio => "Solutio",
            PhaseId::Coagulatio => "Coagulatio",
        }
    }

    /// The full default sequence
    pub fn default_sequence() -> Vec<PhaseId> {
        vec![PhaseId::PrimaMateria, PhaseId::Solutio, PhaseId::Coagulatio]
    }

    /// Whether this phase consumes candidates from a prior phase.
    pub fn depends_on_prior(&self) -> bool {
        !matches!(self, PhaseId::PrimaMateria)
    }
}

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for PhaseId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "prima-materia" | "primamateria" | "idea" => Ok(PhaseId::PrimaMateria),
            "solutio" | "human" => Ok(PhaseId::Solutio),
            "coagulatio" | "precision" => Ok(PhaseId::Coagulatio),
            other => Err(DomainError::UnknownPhase(other.to_string())),
        }
    }
}

impl Serialize for PhaseId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PhaseId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of a registered provider (e.g. "ollama", "openai")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Provider settings for one phase (Value Object)
///
/// Immutable once a pipeline run starts. Several configs for the same
/// phase put that phase in ensemble mode: one provider call per config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    pub phase: PhaseId,
    pub provider: ProviderId,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl PhaseConfig {
    pub fn new(phase: PhaseId, provider: impl Into<ProviderId>, model: impl Into<String>) -> Self {
        Self {
            phase,
            provider: provider.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_roundtrip() {
        for phase in PhaseId::default_sequence() {
            let parsed: PhaseId = phase.as_str().parse().unwrap();
            assert_eq!(parsed, phase);
        }
    }

    #[test]
    fn test_phase_legacy_aliases() {
        assert_eq!("idea".parse::<PhaseId>().unwrap(), PhaseId::PrimaMateria);
        assert_eq!("human".parse::<PhaseId>().unwrap(), PhaseId::Solutio);
        assert_eq!("precision".parse::<PhaseId>().unwrap(), PhaseId::Coagulatio);
        assert_eq!("prima_materia".parse::<PhaseId>().unwrap(), PhaseId::PrimaMateria);
    }

    #[test]
    fn test_unknown_phase() {
        let err = "nigredo".parse::<PhaseId>().unwrap_err();
        assert_eq!(err, DomainError::UnknownPhase("nigredo".to_string()));
    }

    #[test]
    fn test_only_first_phase_is_independent() {
        assert!(!PhaseId::PrimaMateria.depends_on_prior());
        assert!(PhaseId::Solutio.depends_on_prior());
        assert!(PhaseId::Coagulatio.depends_on_prior());
    }

    #[test]
    fn test_phase_serde_uses_kebab_id() {
        let json = serde_json::to_string(&PhaseId::PrimaMateria).unwrap();
        assert_eq!(json, "\"prima-materia\"");
        let back: PhaseId = serde_json::from_str("\"coagulatio\"").unwrap();
        assert_eq!(back, PhaseId::Coagulatio);
    }

    #[test]
    fn test_phase_config_builder() {
        let config = PhaseConfig::new(PhaseId::Solutio, "ollama", "llama3")
            .with_temperature(0.4)
            .with_max_tokens(512);
        assert_eq!(config.provider.as_str(), "ollama");
        assert_eq!(config.temperature, 0.4);
        assert_eq!(config.max_tokens, 512);
    }
}
