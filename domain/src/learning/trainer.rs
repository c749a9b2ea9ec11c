//! Ranking model retraining
//!
//! Online gradient adjustment of feature weights toward observed outcomes.
//! For each sample the model's prediction is compared with the outcome's
//! target and every weight moves by `learning_rate * error * feature`,
//! capped at `max_step` so a single outlier cannot swing the model.
//!
//! Retraining always starts from the cold-start weights and replays samples
//! in `(observed_at, candidate_id)` order, so it is a pure function of the
//! accumulated sample set.

use super::outcome::TrainingSample;
use crate::ranking::{Feature, RankingModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters controlling retraining
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningParams {
    /// Step size of each gradient update
    pub learning_rate: f64,
    /// Largest change any single sample may apply to one weight
    pub max_step: f64,
    /// Below this many usable samples the cold-start weights are kept
    pub min_samples: usize,
    /// Inclusive bounds every weight is clamped to
    pub min_weight: f64,
    pub max_weight: f64,
}

impl Default for LearningParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_step: 0.05,
            min_samples: 10,
            min_weight: 0.0,
            max_weight: 1.0,
        }
    }
}

/// Produce a new model from the base weights and the accumulated samples.
///
/// Samples without features are ignored. The returned model has version
/// `next_version` regardless of whether the weights changed.
pub fn retrain(
    base: &RankingModel,
    samples: &[TrainingSample],
    params: &LearningParams,
    next_version: u64,
) -> RankingModel {
    let mut usable: Vec<&TrainingSample> =
        samples.iter().filter(|s| !s.features.is_empty()).collect();

    let mut weights: BTreeMap<Feature, f64> = base.weights().clone();

    if usable.len() >= params.min_samples {
        usable.sort_by(|a, b| {
            a.outcome
                .observed_at
                .cmp(&b.outcome.observed_at)
                .then_with(|| a.outcome.candidate_id.cmp(&b.outcome.candidate_id))
        });

        for sample in &usable {
            let prediction: f64 = weights
                .iter()
                .map(|(feature, weight)| weight * sample.features.get(*feature))
                .sum();
            let error = sample.outcome.signal.target() - prediction;

            for (feature, weight) in weights.iter_mut() {
                let step = (params.learning_rate * error * sample.features.get(*feature))
                    .clamp(-params.max_step, params.max_step);
                *weight = (*weight + step).clamp(params.min_weight, params.max_weight);
            }
        }
    }

    // Weights are finite and clamped to non-negative bounds, and the map is
    // the non-empty base map, so construction cannot fail.
    RankingModel::from_weights(next_version, weights, usable.len()).unwrap_or_else(|_| base.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::CandidateId;
    use crate::learning::outcome::{OutcomeSignal, Signal};
    use crate::ranking::FeatureVector;
    use chrono::{Duration, TimeZone, Utc};

    fn sample(n: i64, signal: Signal, diversity: f64) -> TrainingSample {
        let at = Utc.timestamp_opt(1_700_000_000 + n, 0).unwrap();
        TrainingSample {
            outcome: OutcomeSignal::new(CandidateId::new(), signal).observed_at(at),
            features: FeatureVector::new()
                .with(Feature::LexicalDiversity, diversity)
                .with(Feature::PhaseCompletion, 1.0),
        }
    }

    #[test]
    fn test_below_threshold_keeps_cold_start() {
        let base = RankingModel::cold_start();
        let samples: Vec<_> = (0..3).map(|i| sample(i, Signal::Accepted, 1.0)).collect();
        let model = retrain(&base, &samples, &LearningParams::default(), 1);
        assert!(model.weights_approx_eq(&base, 1e-12));
        assert_eq!(model.version(), 1);
        assert_eq!(model.training_sample_count(), 3);
    }

    #[test]
    fn test_accepted_reinforces_and_rejected_dampens() {
        let base = RankingModel::cold_start();
        let params = LearningParams {
            min_samples: 1,
            ..Default::default()
        };

        let accepted: Vec<_> = (0..5).map(|i| sample(i, Signal::Accepted, 1.0)).collect();
        let up = retrain(&base, &accepted, &params, 1);
        assert!(up.weight(Feature::LexicalDiversity) > base.weight(Feature::LexicalDiversity));

        let rejected: Vec<_> = (0..5).map(|i| sample(i, Signal::Rejected, 1.0)).collect();
        let down = retrain(&base, &rejected, &params, 1);
        assert!(down.weight(Feature::LexicalDiversity) < base.weight(Feature::LexicalDiversity));
        // Features absent from samples are untouched
        assert_eq!(
            down.weight(Feature::EmbeddingSimilarity),
            base.weight(Feature::EmbeddingSimilarity)
        );
    }

    #[test]
    fn test_single_outlier_is_capped() {
        let base = RankingModel::cold_start();
        let params = LearningParams {
            min_samples: 1,
            learning_rate: 100.0,
            ..Default::default()
        };
        let model = retrain(&base, &[sample(0, Signal::Rejected, 1.0)], &params, 1);
        let delta = base.weight(Feature::LexicalDiversity) - model.weight(Feature::LexicalDiversity);
        assert!((delta - params.max_step).abs() < 1e-12);
    }

    #[test]
    fn test_retrain_is_pure_over_sample_order() {
        let base = RankingModel::cold_start();
        let params = LearningParams {
            min_samples: 2,
            ..Default::default()
        };
        let samples = vec![
            sample(0, Signal::Accepted, 0.9),
            sample(1, Signal::Rejected, 0.2),
            sample(2, Signal::Edited, 0.5),
        ];
        let mut shuffled = samples.clone();
        shuffled.rotate_left(1);

        let a = retrain(&base, &samples, &params, 1);
        let b = retrain(&base, &shuffled, &params, 2);
        assert!(a.weights_approx_eq(&b, 1e-12));
    }

    #[test]
    fn test_samples_without_features_are_skipped() {
        let base = RankingModel::cold_start();
        let params = LearningParams {
            min_samples: 1,
            ..Default::default()
        };
        let empty = TrainingSample {
            outcome: OutcomeSignal::new(CandidateId::new(), Signal::Accepted)
                .observed_at(Utc::now() - Duration::seconds(5)),
            features: FeatureVector::new(),
        };
        let model = retrain(&base, &[empty], &params, 1);
        assert_eq!(model.training_sample_count(), 0);
        assert!(model.weights_approx_eq(&base, 1e-12));
    }
}
