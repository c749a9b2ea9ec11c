//! Outcome signals and training samples

use crate::core::error::DomainError;
use crate::generation::CandidateId;
use crate::ranking::FeatureVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What eventually happened to a produced candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Accepted,
    Rejected,
    Edited,
    Unused,
}

impl Signal {
    /// Training target the model is nudged toward for this outcome
    pub fn target(&self) -> f64 {
        match self {
            Signal::Accepted => 1.0,
            Signal::Edited => 0.7,
            Signal::Unused => 0.3,
            Signal::Rejected => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Accepted => "accepted",
            Signal::Rejected => "rejected",
            Signal::Edited => "edited",
            Signal::Unused => "unused",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Signal {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accepted" | "accept" => Ok(Signal::Accepted),
            "rejected" | "reject" => Ok(Signal::Rejected),
            "edited" | "edit" => Ok(Signal::Edited),
            "unused" => Ok(Signal::Unused),
            other => Err(DomainError::UnknownSignal(other.to_string())),
        }
    }
}

/// Feedback about a previously produced candidate (Value Object)
///
/// Appended to the feedback store and never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSignal {
    pub candidate_id: CandidateId,
    pub signal: Signal,
    pub observed_at: DateTime<Utc>,
}

impl OutcomeSignal {
    pub fn new(candidate_id: CandidateId, signal: Signal) -> Self {
        Self {
            candidate_id,
            signal,
            observed_at: Utc::now(),
        }
    }

    pub fn observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }
}

/// An outcome paired with the features its candidate was ranked with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub outcome: OutcomeSignal,
    pub features: FeatureVector,
}
