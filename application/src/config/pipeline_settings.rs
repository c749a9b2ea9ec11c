//! Pipeline settings: run-level knobs and feature toggles.
//!
//! [`PipelineSettings`] is the typed snapshot the orchestrator reads. It is
//! built once from configuration and never mutated during a run.

use super::retry_policy::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Feature toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureToggles {
    /// Run leading independent phases concurrently and fan provider calls out in parallel.
    pub parallel_phases: bool,
    /// Record outcome signals and retrain the ranking model.
    pub learning: bool,
    /// Memoize successful provider responses.
    pub caching: bool,
    /// Compute embedding similarity when an embedding port is available.
    pub embeddings: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            parallel_phases: true,
            learning: true,
            caching: false,
            embeddings: false,
        }
    }
}

/// Run-level execution parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Number of candidates returned when the request does not say otherwise.
    pub count: usize,
    /// Deadline applied when the request carries none.
    pub deadline: Duration,
    /// Upper bound for a single provider attempt.
    pub per_call_timeout: Duration,
    pub retry: RetryPolicy,
    pub features: FeatureToggles,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            count: alchemy_domain::DEFAULT_COUNT,
            deadline: Duration::from_secs(120),
            per_call_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            features: FeatureToggles::default(),
        }
    }
}

impl PipelineSettings {
    // ==================== Builder Methods ====================

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_per_call_timeout(mut self, timeout: Duration) -> Self {
        self.per_call_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_features(mut self, features: FeatureToggles) -> Self {
        self.features = features;
        self
    }

    pub fn with_parallel_phases(mut self, enabled: bool) -> Self {
        self.features.parallel_phases = enabled;
        self
    }

    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.features.caching = enabled;
        self
    }

    /// Per-attempt timeout for a phase that gets `phase_share` of the
    /// remaining deadline.
    ///
    /// Always strictly smaller than a non-zero share.
    pub fn attempt_timeout(&self, phase_share: Duration) -> Duration {
        self.per_call_timeout.min(phase_share.mul_f64(0.9))
    }
}
