//! Pipeline configuration from TOML (`[pipeline]` and `[features]` sections)

use alchemy_application::{FeatureToggles, PipelineSettings, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw pipeline configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    /// Phase sequence, by phase id
    pub phases: Vec<String>,
    /// Number of candidates to return
    pub count: usize,
    /// Deadline for a whole run
    pub deadline_seconds: u64,
    /// Upper bound for a single provider attempt
    pub per_call_timeout_seconds: u64,
    /// Retries after the first attempt on transient provider errors
    pub max_retries: usize,
    /// Base delay of the exponential backoff
    pub retry_backoff_ms: u64,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        Self {
            phases: vec![
                "prima-materia".to_string(),
                "solutio".to_string(),
                "coagulatio".to_string(),
            ],
            count: 3,
            deadline_seconds: 120,
            per_call_timeout_seconds: 60,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

/// Raw feature toggles from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileFeaturesConfig {
    pub parallel_phases: bool,
    pub learning: bool,
    pub caching: bool,
    pub embeddings: bool,
}

impl Default for FileFeaturesConfig {
    fn default() -> Self {
        let toggles = FeatureToggles::default();
        Self {
            parallel_phases: toggles.parallel_phases,
            learning: toggles.learning,
            caching: toggles.caching,
            embeddings: toggles.embeddings,
        }
    }
}

impl FileFeaturesConfig {
    pub fn to_toggles(&self) -> FeatureToggles {
        FeatureToggles {
            parallel_phases: self.parallel_phases,
            learning: self.learning,
            caching: self.caching,
            embeddings: self.embeddings,
        }
    }
}

impl FilePipelineConfig {
    pub fn to_settings(&self, features: &FileFeaturesConfig) -> PipelineSettings {
        let retry = RetryPolicy {
            max_retries: self.max_retries,
            base_backoff: Duration::from_millis(self.retry_backoff_ms),
            ..RetryPolicy::default()
        };
        PipelineSettings::default()
            .with_count(self.count)
            .with_deadline(Duration::from_secs(self.deadline_seconds))
            .with_per_call_timeout(Duration::from_secs(self.per_call_timeout_seconds))
            .with_retry(retry)
            .with_features(features.to_toggles())
    }
}
