//! Deterministic candidate ranking
//!
//! Scores terminal candidates with a [`RankingModel`] snapshot, orders them
//! by score, drops near-duplicates and truncates to the requested count.
//! The ordering is total: score descending, then earlier `generated_at`,
//! then ascending candidate id. Identical inputs always rank identically,
//! whatever order the candidates arrived in.

use super::features::{
    Feature, FeatureVector, length_appropriateness, lexical_diversity, phase_completion,
};
use super::model::RankingModel;
use super::scored::ScoredCandidate;
use crate::core::string::normalize_text;
use crate::generation::{Candidate, CandidateId};
use crate::phase::ProviderId;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Reliability assumed for providers without observations
pub const DEFAULT_RELIABILITY: f64 = 0.5;

/// Per-run signals the ranker needs besides the candidates themselves
#[derive(Debug, Clone, Default)]
pub struct RankingContext {
    /// Number of phases the run was configured with
    pub total_phases: usize,
    /// Length of each candidate's refinement chain (defaults to 1)
    pub chain_lengths: HashMap<CandidateId, usize>,
    /// Reliability prior per provider, in `[0, 1]`
    pub provider_reliability: HashMap<ProviderId, f64>,
    /// Embedding similarity to the original input, when available
    pub embedding_similarity: HashMap<CandidateId, f64>,
}

impl RankingContext {
    pub fn new(total_phases: usize) -> Self {
        Self {
            total_phases,
            ..Default::default()
        }
    }

    /// Compute the feature vector for each candidate, in input order.
    pub fn features_for(&self, candidates: &[Candidate]) -> Vec<FeatureVector> {
        candidates
            .iter()
            .enumerate()
            .map(|(i, candidate)| {
                let siblings: Vec<&str> = candidates
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, c)| c.text.as_str())
                    .collect();
                let chain_len = self.chain_lengths.get(&candidate.id).copied().unwrap_or(1);
                let reliability = self
                    .provider_reliability
                    .get(&candidate.provider)
                    .copied()
                    .unwrap_or(DEFAULT_RELIABILITY);
                let embedding = self
                    .embedding_similarity
                    .get(&candidate.id)
                    .copied()
                    .unwrap_or(0.0);

                FeatureVector::new()
                    .with(Feature::LengthAppropriateness, length_appropriateness(&candidate.text))
                    .with(
                        Feature::PhaseCompletion,
                        phase_completion(chain_len, self.total_phases),
                    )
                    .with(Feature::ProviderReliability, reliability)
                    .with(
                        Feature::LexicalDiversity,
                        lexical_diversity(&candidate.text, &siblings),
                    )
                    .with(Feature::EmbeddingSimilarity, embedding)
            })
            .collect()
    }
}

/// Rank candidates and return at most `count` of them.
///
/// Fewer surviving candidates than `count` is not an error: all of them are
/// returned.
pub fn rank(
    candidates: &[Candidate],
    context: &RankingContext,
    model: &RankingModel,
    count: usize,
) -> Vec<ScoredCandidate> {
    let features = context.features_for(candidates);

    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .zip(features)
        .map(|(candidate, features)| {
            let (score, breakdown) = model.score(&features);
            ScoredCandidate {
                candidate: candidate.clone(),
                score,
                rank_position: 0,
                breakdown,
                features,
                model_version: model.version(),
            }
        })
        .collect();

    scored.sort_by(compare_scored);

    let mut seen = HashSet::new();
    scored.retain(|s| seen.insert(normalize_text(&s.candidate.text)));
    scored.truncate(count);

    for (i, s) in scored.iter_mut().enumerate() {
        s.rank_position = i + 1;
    }
    scored
}

fn compare_scored(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.candidate.generated_at.cmp(&b.candidate.generated_at))
        .then_with(|| a.candidate.id.cmp(&b.candidate.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::PhaseId;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn candidate(n: u128, text: &str) -> Candidate {
        Candidate::new(PhaseId::Coagulatio, ProviderId::new("p"), "m", text)
            .with_id(CandidateId::from_uuid(uuid::Uuid::from_u128(n)))
            .with_generated_at(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
    }

    fn length_only_model() -> RankingModel {
        RankingModel::from_weights(
            1,
            BTreeMap::from([(Feature::LengthAppropriateness, 1.0)]),
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_rank_is_deterministic_regardless_of_input_order() {
        let candidates = vec![
            candidate(3, &"c".repeat(40)),
            candidate(1, &"a".repeat(40)),
            candidate(2, &"b".repeat(90)),
        ];
        let mut reversed = candidates.clone();
        reversed.reverse();

        let context = RankingContext::new(3);
        let model = RankingModel::cold_start();
        let first = rank(&candidates, &context, &model, 10);
        let second = rank(&reversed, &context, &model, 10);

        let ids = |v: &[ScoredCandidate]| v.iter().map(|s| s.candidate.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(ids(&first), ids(&rank(&candidates, &context, &model, 10)));
    }

    #[test]
    fn test_ties_break_by_time_then_id() {
        let model = length_only_model();
        let context = RankingContext::new(1);
        let early = candidate(9, &"x".repeat(50))
            .with_generated_at(Utc.timestamp_opt(1_600_000_000, 0).unwrap());
        let late_low_id = candidate(1, &"y".repeat(50));
        let late_high_id = candidate(2, &"z".repeat(50));

        let ranked = rank(
            &[late_high_id.clone(), late_low_id.clone(), early.clone()],
            &context,
            &model,
            3,
        );
        let ids: Vec<_> = ranked.iter().map(|s| s.candidate.id).collect();
        assert_eq!(ids, vec![early.id, late_low_id.id, late_high_id.id]);
        assert_eq!(
            ranked.iter().map(|s| s.rank_position).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_duplicates_collapse_to_highest_scoring() {
        let model = length_only_model();
        let context = RankingContext::new(1);
        let short = candidate(1, "Same   TEXT");
        let long = candidate(2, &"long ".repeat(30));
        let dup = candidate(3, "same text");

        let ranked = rank(&[short, long.clone(), dup], &context, &model, 10);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].candidate.id, long.id);
        // Equal scores and timestamps: the lower id represents the group
        assert_eq!(ranked[1].candidate.id, CandidateId::from_uuid(uuid::Uuid::from_u128(1)));
    }

    #[test]
    fn test_count_bounds_output_without_error_when_short() {
        let context = RankingContext::new(1);
        let model = RankingModel::cold_start();
        let candidates: Vec<_> = (0..4).map(|i| candidate(i, &format!("text {i}"))).collect();
        assert_eq!(rank(&candidates, &context, &model, 2).len(), 2);
        assert_eq!(rank(&candidates, &context, &model, 10).len(), 4);
        assert!(rank(&[], &context, &model, 3).is_empty());
    }

    #[test]
    fn test_five_of_eight_with_duplicates() {
        let context = RankingContext::new(1);
        let model = length_only_model();
        let mut candidates: Vec<_> = (0..6)
            .map(|i| candidate(i, &format!("distinct candidate number {i}")))
            .collect();
        // Same normalized text as candidates 0 and 1, but longer raw text
        let padded_zero = candidate(100, "Distinct  CANDIDATE number 0    ");
        candidates.push(padded_zero.clone());
        candidates.push(candidate(101, "distinct candidate\nnumber 1"));

        let ranked = rank(&candidates, &context, &model, 5);
        assert_eq!(ranked.len(), 5);
        let texts: HashSet<_> = ranked.iter().map(|s| normalize_text(s.text())).collect();
        assert_eq!(texts.len(), 5);
        assert_eq!(ranked[0].candidate.id, padded_zero.id);
    }

    #[test]
    fn test_missing_embeddings_contribute_zero() {
        let context = RankingContext::new(1);
        let model = RankingModel::cold_start();
        let ranked = rank(&[candidate(1, "only one")], &context, &model, 1);
        assert_eq!(ranked[0].breakdown[&Feature::EmbeddingSimilarity], 0.0);
        assert_eq!(ranked[0].features.get(Feature::LexicalDiversity), 1.0);
        assert_eq!(
            ranked[0].features.get(Feature::ProviderReliability),
            DEFAULT_RELIABILITY
        );
    }

    #[test]
    fn test_phase_completion_favours_full_chains() {
        let model = RankingModel::from_weights(
            1,
            BTreeMap::from([(Feature::PhaseCompletion, 1.0)]),
            0,
        )
        .unwrap();
        let full = candidate(2, "refined through every phase");
        let partial = candidate(1, "passed through a single phase");
        let mut context = RankingContext::new(3);
        context.chain_lengths.insert(full.id, 3);
        context.chain_lengths.insert(partial.id, 1);

        let ranked = rank(&[partial, full.clone()], &context, &model, 2);
        assert_eq!(ranked[0].candidate.id, full.id);
        assert!((ranked[0].score - 1.0).abs() < 1e-9);
    }
}
