//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly; string ids are resolved to domain types
//! once, during validation and conversion.

mod learning;
mod paths;
mod phases;
mod pipeline;
mod providers;

pub use learning::{FileLearningConfig, FileRankingConfig};
pub use paths::{FileLoggingConfig, FileStorageConfig, FileTemplatesConfig};
pub use phases::FilePhaseConfig;
pub use pipeline::{FileFeaturesConfig, FilePipelineConfig};
pub use providers::{FileProviderConfig, FileProvidersConfig, ProviderKind};

use alchemy_application::PipelineSettings;
use alchemy_domain::{DomainError, Feature, PhaseConfig, PhaseId, RankingModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("pipeline.phases cannot be empty")]
    EmptyPhaseSequence,

    #[error("unknown phase '{0}'")]
    UnknownPhase(String),

    #[error("phase {0} appears more than once in pipeline.phases")]
    DuplicatePhase(String),

    #[error("no [[phase]] entry configures phase {0}")]
    UnconfiguredPhase(String),

    #[error("phase {phase} uses provider '{provider}' which has no [providers.{provider}] section")]
    UnknownProvider { phase: String, provider: String },

    #[error("model name cannot be empty (phase {0})")]
    EmptyModelName(String),

    #[error("temperature {value} for phase {phase} is outside 0.0..=2.0")]
    InvalidTemperature { phase: String, value: f64 },

    #[error("max_tokens cannot be 0 (phase {0})")]
    ZeroMaxTokens(String),

    #[error("pipeline.count cannot be 0")]
    ZeroCount,

    #[error("{0} cannot be 0")]
    InvalidTimeout(&'static str),

    #[error("invalid ranking weights: {0}")]
    InvalidWeights(#[from] DomainError),

    #[error("invalid learning parameter: {0}")]
    InvalidLearning(String),

    #[error("embedding provider '{0}' must be an ollama provider")]
    InvalidEmbeddingProvider(String),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Phase sequence, count, deadline and retry settings
    pub pipeline: FilePipelineConfig,
    /// Feature toggles
    pub features: FileFeaturesConfig,
    /// Provider assignments per phase
    pub phase: Vec<FilePhaseConfig>,
    /// Provider endpoints
    pub providers: FileProvidersConfig,
    pub ranking: FileRankingConfig,
    pub learning: FileLearningConfig,
    pub storage: FileStorageConfig,
    pub logging: FileLoggingConfig,
    pub templates: FileTemplatesConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            pipeline: FilePipelineConfig::default(),
            features: FileFeaturesConfig::default(),
            phase: FilePhaseConfig::defaults(),
            providers: providers::default_providers(),
            ranking: FileRankingConfig::default(),
            learning: FileLearningConfig::default(),
            storage: FileStorageConfig::default(),
            logging: FileLoggingConfig::default(),
            templates: FileTemplatesConfig::default(),
        }
    }
}

impl FileConfig {
    /// Validate the configuration, returning the first problem found
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.pipeline.count == 0 {
            return Err(ConfigValidationError::ZeroCount);
        }
        if self.pipeline.deadline_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout("pipeline.deadline_seconds"));
        }
        if self.pipeline.per_call_timeout_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout(
                "pipeline.per_call_timeout_seconds",
            ));
        }

        let sequence = self.phase_sequence()?;
        self.phase_configs()?;
        for phase in &sequence {
            if !self.phase.iter().any(|p| p.parse_phase() == Some(*phase)) {
                return Err(ConfigValidationError::UnconfiguredPhase(phase.to_string()));
            }
        }

        for (id, provider) in &self.providers {
            if provider.timeout_seconds == 0 {
                return Err(ConfigValidationError::InvalidTimeout("providers.timeout_seconds"));
            }
            if let Some(embedding) = &self.ranking.embedding_provider
                && embedding == id
                && provider.kind != ProviderKind::Ollama
            {
                return Err(ConfigValidationError::InvalidEmbeddingProvider(id.clone()));
            }
        }
        if let Some(embedding) = &self.ranking.embedding_provider
            && !self.providers.contains_key(embedding)
        {
            return Err(ConfigValidationError::InvalidEmbeddingProvider(embedding.clone()));
        }

        let learning = &self.learning;
        if !(learning.learning_rate > 0.0 && learning.learning_rate.is_finite()) {
            return Err(ConfigValidationError::InvalidLearning(
                "learning_rate must be positive".to_string(),
            ));
        }
        if !(learning.max_step > 0.0 && learning.max_step.is_finite()) {
            return Err(ConfigValidationError::InvalidLearning(
                "max_step must be positive".to_string(),
            ));
        }
        if learning.retrain_interval_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout(
                "learning.retrain_interval_seconds",
            ));
        }

        self.cold_start_model()?;
        Ok(())
    }

    /// The configured phase sequence
    pub fn phase_sequence(&self) -> Result<Vec<PhaseId>, ConfigValidationError> {
        if self.pipeline.phases.is_empty() {
            return Err(ConfigValidationError::EmptyPhaseSequence);
        }
        let mut sequence: Vec<PhaseId> = Vec::with_capacity(self.pipeline.phases.len());
        for name in &self.pipeline.phases {
            let phase: PhaseId = name
                .parse()
                .map_err(|_| ConfigValidationError::UnknownPhase(name.clone()))?;
            if sequence.contains(&phase) {
                return Err(ConfigValidationError::DuplicatePhase(phase.to_string()));
            }
            sequence.push(phase);
        }
        Ok(sequence)
    }

    /// Typed provider assignments for every `[[phase]]` entry
    pub fn phase_configs(&self) -> Result<Vec<PhaseConfig>, ConfigValidationError> {
        self.phase
            .iter()
            .map(|entry| {
                let config = entry
                    .to_phase_config()
                    .ok_or_else(|| ConfigValidationError::UnknownPhase(entry.phase.clone()))?;
                if !self.providers.contains_key(&entry.provider) {
                    return Err(ConfigValidationError::UnknownProvider {
                        phase: entry.phase.clone(),
                        provider: entry.provider.clone(),
                    });
                }
                if entry.model.trim().is_empty() {
                    return Err(ConfigValidationError::EmptyModelName(entry.phase.clone()));
                }
                if !(0.0..=2.0).contains(&entry.temperature) {
                    return Err(ConfigValidationError::InvalidTemperature {
                        phase: entry.phase.clone(),
                        value: entry.temperature,
                    });
                }
                if entry.max_tokens == 0 {
                    return Err(ConfigValidationError::ZeroMaxTokens(entry.phase.clone()));
                }
                Ok(config)
            })
            .collect()
    }

    /// Default weights with `[ranking.weights]` overrides applied
    pub fn cold_start_model(&self) -> Result<RankingModel, ConfigValidationError> {
        let mut overrides = BTreeMap::new();
        for (name, weight) in &self.ranking.weights {
            let feature: Feature = name.parse()?;
            overrides.insert(feature, *weight);
        }
        Ok(RankingModel::with_overrides(&overrides)?)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        self.pipeline.to_settings(&self.features)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
