//! Phase provider assignments from TOML (`[[phase]]` entries)

use alchemy_domain::{PhaseConfig, PhaseId};
use serde::{Deserialize, Serialize};

/// One provider assignment for a phase.
///
/// Several entries for the same phase form an ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePhaseConfig {
    pub phase: String,
    pub provider: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

impl FilePhaseConfig {
    pub fn new(phase: PhaseId, provider: &str, model: &str) -> Self {
        Self {
            phase: phase.as_str().to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    /// Default assignments: every phase on the local Ollama instance.
    pub fn defaults() -> Vec<Self> {
        PhaseId::default_sequence()
            .into_iter()
            .map(|phase| Self::new(phase, "ollama", "gemma3:4b"))
            .collect()
    }

    pub fn parse_phase(&self) -> Option<PhaseId> {
        self.phase.parse().ok()
    }

    pub fn to_phase_config(&self) -> Option<PhaseConfig> {
        Some(
            PhaseConfig::new(self.parse_phase()?, self.provider.as_str(), self.model.clone())
                .with_temperature(self.temperature)
                .with_max_tokens(self.max_tokens),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_entries_deserialize() {
        let toml_str = r#"
[[phase]]
phase = "idea"
provider = "openai"
model = "gpt-4o-mini"
temperature = 0.9

[[phase]]
phase = "idea"
provider = "ollama"
model = "llama3"
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.phase.len(), 2);

        let first = config.phase[0].to_phase_config().unwrap();
        assert_eq!(first.phase, PhaseId::PrimaMateria);
        assert_eq!(first.temperature, 0.9);
        assert_eq!(first.max_tokens, 2000);
        assert_eq!(config.phase[1].provider, "ollama");
    }

    #[test]
    fn test_unknown_phase_does_not_convert() {
        let entry = FilePhaseConfig {
            phase: "rubedo".to_string(),
            ..FilePhaseConfig::new(PhaseId::Solutio, "ollama", "m")
        };
        assert!(entry.to_phase_config().is_none());
    }
}
