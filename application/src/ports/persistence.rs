//! Persistence ports
//!
//! Storage contracts for generated candidates, ranked selections, outcome
//! signals and the published ranking model. Implementations live in the
//! infrastructure layer.

use alchemy_domain::{Candidate, FeatureVector, OutcomeSignal, RankingModel, ScoredCandidate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },
}

/// One ranked entry of a persisted selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub candidate_id: alchemy_domain::CandidateId,
    pub rank_position: usize,
    pub score: f64,
    pub features: FeatureVector,
}

impl From<&ScoredCandidate> for SelectionEntry {
    fn from(scored: &ScoredCandidate) -> Self {
        Self {
            candidate_id: scored.candidate.id,
            rank_position: scored.rank_position,
            score: scored.score,
            features: scored.features.clone(),
        }
    }
}

/// The ranked result of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub session_id: String,
    pub model_version: u64,
    pub recorded_at: DateTime<Utc>,
    pub entries: Vec<SelectionEntry>,
}

impl SelectionRecord {
    pub fn new(session_id: impl Into<String>, model_version: u64, ranked: &[ScoredCandidate]) -> Self {
        Self {
            session_id: session_id.into(),
            model_version,
            recorded_at: Utc::now(),
            entries: ranked.iter().map(SelectionEntry::from).collect(),
        }
    }
}

/// Storage for generated candidates and ranked selections
#[async_trait]
pub trait CandidateRepository: Send + Sync {
    async fn save_candidates(
        &self,
        session_id: &str,
        candidates: &[Candidate],
    ) -> Result<(), RepositoryError>;

    async fn save_selection(&self, selection: &SelectionRecord) -> Result<(), RepositoryError>;

    async fn load_selections(&self) -> Result<Vec<SelectionRecord>, RepositoryError>;
}

/// Storage for outcome signals and the ranking model
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn append_signals(&self, signals: &[OutcomeSignal]) -> Result<(), RepositoryError>;

    async fn load_signals(&self) -> Result<Vec<OutcomeSignal>, RepositoryError>;

    async fn save_model(&self, model: &RankingModel) -> Result<(), RepositoryError>;

    /// Returns `None` when no model has been saved yet
    async fn load_model(&self) -> Result<Option<RankingModel>, RepositoryError>;
}
