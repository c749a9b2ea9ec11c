//! Feedback store and retraining
//!
//! Accepts outcome signals for previously ranked candidates, keeps the
//! feature vectors those candidates were ranked with, and periodically
//! retrains the ranking model.
//!
//! The published model is an immutable snapshot behind an `Arc`. Readers
//! clone the `Arc` and never observe a partially updated model. Only the
//! retraining path takes an exclusive section, and only while computing.

use crate::ports::observability::{EventType, ObservabilityEvent, ObservabilitySink, NoObservability};
use crate::ports::persistence::{
    CandidateRepository, FeedbackRepository, RepositoryError, SelectionRecord,
};
use alchemy_domain::{
    CandidateId, FeatureVector, LearningParams, OutcomeSignal, RankingModel, ScoredCandidate,
    TrainingSample, retrain,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Default)]
struct FeedbackLog {
    signals: Vec<OutcomeSignal>,
    /// Ranked features by candidate. Never pruned: any candidate may still
    /// receive an outcome, so the map grows with the candidates ranked or
    /// loaded from persisted selections during this process.
    features: HashMap<CandidateId, FeatureVector>,
    /// Number of leading signals already handed to the repository
    flushed: usize,
}

pub struct FeedbackStore {
    learning_enabled: bool,
    params: LearningParams,
    base: RankingModel,
    published: RwLock<Arc<RankingModel>>,
    log: Mutex<FeedbackLog>,
    retrain_gate: Mutex<()>,
    flush_gate: tokio::sync::Mutex<()>,
    sink: Arc<dyn ObservabilitySink>,
}

impl FeedbackStore {
    /// Create a store whose cold-start model is `base`.
    pub fn new(base: RankingModel, params: LearningParams) -> Self {
        Self {
            learning_enabled: true,
            params,
            published: RwLock::new(Arc::new(base.clone())),
            base,
            log: Mutex::new(FeedbackLog::default()),
            retrain_gate: Mutex::new(()),
            flush_gate: tokio::sync::Mutex::new(()),
            sink: Arc::new(NoObservability),
        }
    }

    /// When disabled, outcomes are ignored and the cold-start model stays published.
    pub fn with_learning(mut self, enabled: bool) -> Self {
        self.learning_enabled = enabled;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn learning_enabled(&self) -> bool {
        self.learning_enabled
    }

    /// The currently published model snapshot.
    pub fn current_model(&self) -> Arc<RankingModel> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remember the features each ranked candidate was scored with.
    pub fn observe_ranking(&self, ranked: &[ScoredCandidate]) {
        let mut log = self.log();
        for scored in ranked {
            log.features
                .insert(scored.candidate.id, scored.features.clone());
        }
    }

    /// Remember features from a persisted selection.
    pub fn observe_selection(&self, selection: &SelectionRecord) {
        let mut log = self.log();
        for entry in &selection.entries {
            log.features
                .insert(entry.candidate_id, entry.features.clone());
        }
    }

    /// Append an outcome signal. Returns `false` when learning is disabled.
    pub fn record_outcome(&self, signal: OutcomeSignal) -> bool {
        if !self.learning_enabled {
            debug!("Learning disabled, ignoring outcome for {}", signal.candidate_id);
            return false;
        }
        let mut log = self.log();
        if !log.features.contains_key(&signal.candidate_id) {
            debug!(
                "Outcome for {} has no ranked features yet, kept for later",
                signal.candidate_id
            );
        }
        log.signals.push(signal);
        true
    }

    /// Load signals that already live in the repository.
    ///
    /// They count as flushed and are not appended again. A signal is
    /// identified by its candidate and observation time, so restoring the
    /// same history twice keeps one copy of each.
    pub fn restore_signals(&self, signals: Vec<OutcomeSignal>) {
        let key = |s: &OutcomeSignal| (s.candidate_id, s.observed_at);
        let mut log = self.log();
        let offered = signals.len();
        let flushed = log.flushed;
        let mut unflushed = log.signals.split_off(flushed);

        let mut known: HashSet<_> = log.signals.iter().map(key).collect();
        for signal in signals {
            if known.insert(key(&signal)) {
                log.signals.push(signal);
            }
        }
        let restored = log.signals.len() - flushed;
        log.flushed = log.signals.len();

        // pending signals the repository already holds need no flush
        unflushed.retain(|s| !known.contains(&key(s)));
        log.signals.extend(unflushed);
        debug!(
            "Restored {} persisted outcome signals ({} already known)",
            restored,
            offered - restored
        );
    }

    /// Rebuild in-memory state from persisted selections, signals and model.
    pub async fn load_history(
        &self,
        candidates: &dyn CandidateRepository,
        feedback: &dyn FeedbackRepository,
    ) -> Result<(), RepositoryError> {
        let selections = candidates.load_selections().await?;
        for selection in &selections {
            self.observe_selection(selection);
        }
        let signals = feedback.load_signals().await?;
        info!(
            "Loaded {} selection(s) and {} outcome signal(s)",
            selections.len(),
            signals.len()
        );
        self.restore_signals(signals);

        if let Some(model) = feedback.load_model().await? {
            self.restore_model(model);
        }
        Ok(())
    }

    /// Publish a previously saved model if it is newer than the current one.
    pub fn restore_model(&self, model: RankingModel) -> bool {
        self.publish(model)
    }

    pub fn signal_count(&self) -> usize {
        self.log().signals.len()
    }

    /// Signals not yet handed to a repository
    pub fn pending_flush(&self) -> usize {
        let log = self.log();
        log.signals.len() - log.flushed
    }

    /// Pair every recorded signal with its ranked features.
    ///
    /// Signals without known features get an empty vector, which the trainer
    /// skips.
    pub fn training_samples(&self) -> Vec<TrainingSample> {
        let log = self.log();
        log.signals
            .iter()
            .map(|signal| TrainingSample {
                outcome: signal.clone(),
                features: log
                    .features
                    .get(&signal.candidate_id)
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Retrain from the cold-start weights and publish the result.
    pub fn retrain(&self) -> Arc<RankingModel> {
        if !self.learning_enabled {
            return self.current_model();
        }

        let started = Instant::now();
        let model = {
            let _gate = self
                .retrain_gate
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let samples = self.training_samples();
            let next_version = self.current_model().version() + 1;
            retrain(&self.base, &samples, &self.params, next_version)
        };

        let version = model.version();
        let used = model.training_sample_count();
        if self.publish(model) {
            info!("Published ranking model v{} ({} samples)", version, used);
        }
        self.sink.emit(
            ObservabilityEvent::new(
                EventType::Retrain,
                format!("v{}: {} samples", version, used),
            )
            .with_duration(started.elapsed()),
        );
        self.current_model()
    }

    /// Hand unflushed signals to `repository`.
    ///
    /// The cursor only advances once the append succeeded, so a failed
    /// flush is retried on the next call.
    pub async fn flush(&self, repository: &dyn FeedbackRepository) -> Result<usize, RepositoryError> {
        let _gate = self.flush_gate.lock().await;

        let (start, batch) = {
            let log = self.log();
            (log.flushed, log.signals[log.flushed..].to_vec())
        };
        if batch.is_empty() {
            return Ok(0);
        }

        repository.append_signals(&batch).await?;

        let mut log = self.log();
        log.flushed = log.flushed.max(start + batch.len());
        debug!("Flushed {} outcome signals", batch.len());
        Ok(batch.len())
    }

    /// Retrain on a fixed interval until `token` is cancelled.
    ///
    /// Each tick flushes pending signals and saves the new model when a
    /// repository is given. Repository failures are logged and retried on
    /// the next tick.
    pub fn spawn_retrain_loop(
        self: Arc<Self>,
        interval: Duration,
        repository: Option<Arc<dyn FeedbackRepository>>,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("Retrain loop stopped");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                if let Some(repository) = &repository
                    && let Err(e) = self.flush(repository.as_ref()).await
                {
                    warn!("Failed to flush outcome signals: {}", e);
                }

                let model = self.retrain();

                if let Some(repository) = &repository
                    && let Err(e) = repository.save_model(&model).await
                {
                    warn!("Failed to save ranking model: {}", e);
                }
            }
        })
    }

    fn publish(&self, model: RankingModel) -> bool {
        let mut published = self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if model.version() <= published.version() {
            return false;
        }
        *published = Arc::new(model);
        true
    }

    fn log(&self) -> MutexGuard<'_, FeedbackLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
