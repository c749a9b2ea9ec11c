//! Rank Candidates use case
//!
//! Gathers the per-run ranking signals that need I/O (embedding similarity),
//! then delegates scoring, ordering and de-duplication to the domain ranker.

use crate::ports::embedding::EmbeddingPort;
use crate::ports::observability::{EventType, ObservabilityEvent, ObservabilitySink};
use alchemy_domain::ranking::features::embedding_score;
use alchemy_domain::{
    Candidate, CandidateId, RankingContext, RankingModel, ScoredCandidate, rank,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Input text for the similarity feature, with the limits the lookups must respect
pub struct EmbeddingQuery<'a> {
    input: &'a str,
    deadline: Option<tokio::time::Instant>,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> EmbeddingQuery<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            deadline: None,
            cancel: None,
        }
    }

    /// Give up on embeddings once `deadline` passes
    pub fn until(mut self, deadline: tokio::time::Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Give up on embeddings once `token` is cancelled
    pub fn cancelled_by(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

pub struct RankingEngine {
    embeddings: Option<Arc<dyn EmbeddingPort>>,
    sink: Arc<dyn ObservabilitySink>,
}

impl RankingEngine {
    pub fn new(sink: Arc<dyn ObservabilitySink>) -> Self {
        Self {
            embeddings: None,
            sink,
        }
    }

    pub fn with_embeddings(mut self, port: Option<Arc<dyn EmbeddingPort>>) -> Self {
        self.embeddings = port;
        self
    }

    /// Score and order `candidates`, returning at most `count`.
    ///
    /// When a query is given and an embedding port is configured, each
    /// candidate's similarity to the input is filled in first. Embedding
    /// failures leave the feature at zero. If the query's deadline passes or
    /// its token is cancelled before every lookup returns, ranking proceeds
    /// without any similarity scores.
    pub async fn rank(
        &self,
        candidates: &[Candidate],
        mut context: RankingContext,
        model: &RankingModel,
        count: usize,
        query: Option<EmbeddingQuery<'_>>,
    ) -> Vec<ScoredCandidate> {
        let started = Instant::now();

        if let (Some(port), Some(query)) = (&self.embeddings, query) {
            let scores = Self::bounded_similarity(port.as_ref(), &query, candidates).await;
            context.embedding_similarity.extend(scores);
        }

        let ranked = rank(candidates, &context, model, count);
        debug!(
            "Ranked {} candidates with model v{}, kept {}",
            candidates.len(),
            model.version(),
            ranked.len()
        );

        self.sink.emit(
            ObservabilityEvent::new(
                EventType::RankingPass,
                format!("{} of {} selected", ranked.len(), candidates.len()),
            )
            .with_duration(started.elapsed()),
        );
        ranked
    }

    async fn bounded_similarity(
        port: &dyn EmbeddingPort,
        query: &EmbeddingQuery<'_>,
        candidates: &[Candidate],
    ) -> HashMap<CandidateId, f64> {
        let lookup = Self::similarity(port, query.input, candidates);
        let deadline = query.deadline;
        let bounded = async move {
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, lookup).await.ok(),
                None => Some(lookup.await),
            }
        };

        let unbounded = CancellationToken::new();
        let cancel = query.cancel.unwrap_or(&unbounded);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Cancelled during embedding lookups, ranking without similarity");
                HashMap::new()
            }
            scores = bounded => scores.unwrap_or_else(|| {
                warn!("Deadline reached during embedding lookups, ranking without similarity");
                HashMap::new()
            }),
        }
    }

    async fn similarity(
        port: &dyn EmbeddingPort,
        input: &str,
        candidates: &[Candidate],
    ) -> HashMap<CandidateId, f64> {
        let mut scores = HashMap::new();
        let reference = match port.embed(input).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Embedding of input failed, similarity disabled: {}", e);
                return scores;
            }
        };

        let vectors = join_all(candidates.iter().map(|c| port.embed(&c.text))).await;
        for (candidate, vector) in candidates.iter().zip(vectors) {
            match vector {
                Ok(vector) => {
                    scores.insert(candidate.id, embedding_score(&reference, &vector));
                }
                Err(e) => debug!("Embedding of {} failed: {}", candidate.id, e),
            }
        }
        scores
    }
}
