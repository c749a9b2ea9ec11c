//! Candidate entity - one generated text attributable to a phase and provider call

use crate::phase::{PhaseId, ProviderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Unique candidate identifier
///
/// Ordering follows the canonical hyphenated form, so comparing ids is the
/// same as comparing their string representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(Uuid);

impl CandidateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CandidateId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A generated candidate (Entity)
///
/// Immutable after creation. `parent` links a refined candidate to the
/// earlier-phase candidate it was produced from, so candidates of one run
/// form a forest rooted at first-phase candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub phase: PhaseId,
    pub provider: ProviderId,
    pub model: String,
    pub text: String,
    pub tokens_used: u32,
    pub latency_ms: u64,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<CandidateId>,
}

impl Candidate {
    /// Creates a new candidate stamped with the current time.
    pub fn new(
        phase: PhaseId,
        provider: ProviderId,
        model: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: CandidateId::new(),
            phase,
            provider,
            model: model.into(),
            text: text.into(),
            tokens_used: 0,
            latency_ms: 0,
            generated_at: Utc::now(),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: CandidateId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_usage(mut self, tokens_used: u32, latency: Duration) -> Self {
        self.tokens_used = tokens_used;
        self.latency_ms = latency.as_millis().min(u128::from(u64::MAX)) as u64;
        self
    }

    pub fn with_id(mut self, id: CandidateId) -> Self {
        self.id = id;
        self
    }

    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}
