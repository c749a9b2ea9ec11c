//! Ranking and learning configuration from TOML (`[ranking]`, `[learning]`)

use alchemy_domain::LearningParams;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRankingConfig {
    /// Cold-start weight overrides, keyed by feature name
    pub weights: BTreeMap<String, f64>,
    /// Provider used to embed candidates when embeddings are enabled
    pub embedding_provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLearningConfig {
    pub min_samples: usize,
    pub learning_rate: f64,
    pub max_step: f64,
    pub retrain_interval_seconds: u64,
}

impl Default for FileLearningConfig {
    fn default() -> Self {
        let params = LearningParams::default();
        Self {
            min_samples: params.min_samples,
            learning_rate: params.learning_rate,
            max_step: params.max_step,
            retrain_interval_seconds: 300,
        }
    }
}

impl FileLearningConfig {
    pub fn to_params(&self) -> LearningParams {
        LearningParams {
            min_samples: self.min_samples,
            learning_rate: self.learning_rate,
            max_step: self.max_step,
            ..LearningParams::default()
        }
    }

    pub fn retrain_interval(&self) -> Duration {
        Duration::from_secs(self.retrain_interval_seconds)
    }
}
