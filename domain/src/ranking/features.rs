//! Ranking features and the heuristics that compute them
//!
//! Every feature value is normalized to `[0, 1]` so that learned weights are
//! comparable across features.

use crate::core::error::DomainError;
use crate::core::string::word_tokens;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Character length below which a candidate is considered too short
pub const MIN_IDEAL_LENGTH: usize = 100;
/// Character length above which a candidate is considered too long
pub const MAX_IDEAL_LENGTH: usize = 2000;

/// A named ranking feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Whether the text length falls in the useful band
    LengthAppropriateness,
    /// Fraction of the configured phases the candidate's chain passed through
    PhaseCompletion,
    /// Observed success rate of the provider that produced the candidate
    ProviderReliability,
    /// How different the text is from its sibling candidates
    LexicalDiversity,
    /// Embedding similarity to the original input (zero when unavailable)
    EmbeddingSimilarity,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::LengthAppropriateness,
        Feature::PhaseCompletion,
        Feature::ProviderReliability,
        Feature::LexicalDiversity,
        Feature::EmbeddingSimilarity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::LengthAppropriateness => "length_appropriateness",
            Feature::PhaseCompletion => "phase_completion",
            Feature::ProviderReliability => "provider_reliability",
            Feature::LexicalDiversity => "lexical_diversity",
            Feature::EmbeddingSimilarity => "embedding_similarity",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Feature {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| DomainError::UnknownFeature(s.to_string()))
    }
}

/// Feature values for one candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(BTreeMap<Feature, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, feature: Feature, value: f64) -> Self {
        self.set(feature, value);
        self
    }

    /// Set a feature value, clamped to `[0, 1]`. Non-finite values become 0.
    pub fn set(&mut self, feature: Feature, value: f64) {
        let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
        self.0.insert(feature, value);
    }

    /// Value of a feature; missing features contribute zero.
    pub fn get(&self, feature: Feature) -> f64 {
        self.0.get(&feature).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        self.0.iter().map(|(f, v)| (*f, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Score the text length: 1.0 inside the ideal band, decaying outside it.
pub fn length_appropriateness(text: &str) -> f64 {
    let len = text.chars().count();
    if len == 0 {
        0.0
    } else if len < MIN_IDEAL_LENGTH {
        len as f64 / MIN_IDEAL_LENGTH as f64
    } else if len > MAX_IDEAL_LENGTH {
        MAX_IDEAL_LENGTH as f64 / len as f64
    } else {
        1.0
    }
}

/// Fraction of the configured phases a chain of `chain_len` covers.
pub fn phase_completion(chain_len: usize, total_phases: usize) -> f64 {
    if total_phases == 0 {
        return 0.0;
    }
    (chain_len as f64 / total_phases as f64).min(1.0)
}

/// One minus the highest word-set Jaccard similarity to any sibling.
///
/// A candidate without siblings is maximally diverse.
pub fn lexical_diversity(text: &str, siblings: &[&str]) -> f64 {
    let words: HashSet<String> = word_tokens(text).collect();
    let max_similarity = siblings
        .iter()
        .map(|sibling| {
            let other: HashSet<String> = word_tokens(sibling).collect();
            jaccard(&words, &other)
        })
        .fold(0.0_f64, f64::max);
    1.0 - max_similarity
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Cosine similarity between two vectors, compared over the shorter length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for i in 0..n {
        let (va, vb) = (f64::from(a[i]), f64::from(b[i]));
        dot += va * vb;
        norm_a += va * va;
        norm_b += vb * vb;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Map a cosine similarity in `[-1, 1]` onto `[0, 1]`.
pub fn embedding_score(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    (cosine_similarity(a, b) + 1.0) / 2.0
}
