//! Scored candidate value object

use super::features::{Feature, FeatureVector};
use crate::generation::Candidate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A candidate with its score for one ranking pass
///
/// Derived data: recomputed on every pass. Only the final selection is
/// handed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
    /// 1-based position in the ranked output
    pub rank_position: usize,
    /// Weighted contribution of each feature to `score`
    pub breakdown: BTreeMap<Feature, f64>,
    /// Raw feature values, kept so outcomes can be paired with them later
    pub features: FeatureVector,
    /// Version of the ranking model that produced the score
    pub model_version: u64,
}

impl ScoredCandidate {
    pub fn text(&self) -> &str {
        &self.candidate.text
    }
}
