//! Ranking model - the weighted-feature scoring function
//!
//! A [`RankingModel`] is an immutable snapshot. Retraining produces a new
//! snapshot instead of mutating an existing one, and the weight map is never
//! empty: construction from an empty map is rejected and deserialization
//! goes through the same check.

use super::features::{Feature, FeatureVector};
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cold-start weights used before enough outcomes have been observed
pub fn default_weights() -> BTreeMap<Feature, f64> {
    BTreeMap::from([
        (Feature::LengthAppropriateness, 0.20),
        (Feature::PhaseCompletion, 0.20),
        (Feature::ProviderReliability, 0.15),
        (Feature::LexicalDiversity, 0.15),
        (Feature::EmbeddingSimilarity, 0.30),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRankingModel")]
pub struct RankingModel {
    version: u64,
    weights: BTreeMap<Feature, f64>,
    training_sample_count: usize,
}

#[derive(Deserialize)]
struct RawRankingModel {
    version: u64,
    weights: BTreeMap<Feature, f64>,
    #[serde(default)]
    training_sample_count: usize,
}

impl TryFrom<RawRankingModel> for RankingModel {
    type Error = DomainError;

    fn try_from(raw: RawRankingModel) -> Result<Self, Self::Error> {
        RankingModel::from_weights(raw.version, raw.weights, raw.training_sample_count)
    }
}

impl Default for RankingModel {
    fn default() -> Self {
        Self {
            version: 0,
            weights: default_weights(),
            training_sample_count: 0,
        }
    }
}

impl RankingModel {
    /// Cold-start model (version 0, default weights)
    pub fn cold_start() -> Self {
        Self::default()
    }

    /// Build a model from explicit weights.
    ///
    /// Fails if the map is empty or any weight is negative or non-finite.
    pub fn from_weights(
        version: u64,
        weights: BTreeMap<Feature, f64>,
        training_sample_count: usize,
    ) -> Result<Self, DomainError> {
        if weights.is_empty() {
            return Err(DomainError::EmptyWeights);
        }
        if let Some((feature, value)) = weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
            return Err(DomainError::InvalidWeight {
                feature: feature.to_string(),
                value: *value,
            });
        }
        Ok(Self {
            version,
            weights,
            training_sample_count,
        })
    }

    /// Cold-start weights overridden by the given entries.
    pub fn with_overrides(overrides: &BTreeMap<Feature, f64>) -> Result<Self, DomainError> {
        let mut weights = default_weights();
        weights.extend(overrides.iter().map(|(f, w)| (*f, *w)));
        Self::from_weights(0, weights, 0)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn weights(&self) -> &BTreeMap<Feature, f64> {
        &self.weights
    }

    pub fn weight(&self, feature: Feature) -> f64 {
        self.weights.get(&feature).copied().unwrap_or(0.0)
    }

    pub fn training_sample_count(&self) -> usize {
        self.training_sample_count
    }

    /// Weighted sum of the features plus each feature's contribution.
    pub fn score(&self, features: &FeatureVector) -> (f64, BTreeMap<Feature, f64>) {
        let breakdown: BTreeMap<Feature, f64> = self
            .weights
            .iter()
            .map(|(feature, weight)| (*feature, weight * features.get(*feature)))
            .collect();
        (breakdown.values().sum(), breakdown)
    }

    /// Whether two models carry the same weights within `tolerance`.
    pub fn weights_approx_eq(&self, other: &RankingModel, tolerance: f64) -> bool {
        self.weights.len() == other.weights.len()
            && self.weights.iter().all(|(feature, w)| {
                other
                    .weights
                    .get(feature)
                    .is_some_and(|o| (w - o).abs() <= tolerance)
            })
    }
}
