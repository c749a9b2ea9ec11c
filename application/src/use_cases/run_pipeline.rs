//! Run Pipeline use case
//!
//! Sequences the configured phases, fans provider calls out per phase,
//! threads surviving candidates from one phase into the next, and ranks the
//! survivors of the final phase. A single deadline and the caller's
//! cancellation token bound the whole run.

use crate::config::PipelineSettings;
use crate::ports::observability::{EventType, ObservabilityEvent, ObservabilitySink};
use crate::ports::persistence::{CandidateRepository, SelectionRecord};
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::use_cases::execute_phase::{PhaseError, PhaseExecutor};
use crate::use_cases::feedback_store::FeedbackStore;
use crate::use_cases::rank_candidates::{EmbeddingQuery, RankingEngine};
use alchemy_domain::{
    Candidate, CandidateArena, CandidateId, DomainError, GenerationRequest, PhaseConfig, PhaseId, ProviderId,
    RankingContext, ScoredCandidate,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that end a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No candidates produced in phase {phase}: {reason}")]
    NoCandidates { phase: PhaseId, reason: String },

    #[error("Pipeline deadline exceeded after {}ms", .elapsed.as_millis())]
    Timeout {
        elapsed: Duration,
        partial: Vec<ScoredCandidate>,
    },

    #[error("Pipeline cancelled")]
    Cancelled { partial: Vec<ScoredCandidate> },
}

impl PipelineError {
    /// Best-effort results carried by timeout and cancellation errors
    pub fn partial(&self) -> &[ScoredCandidate] {
        match self {
            PipelineError::Timeout { partial, .. } | PipelineError::Cancelled { partial } => partial,
            _ => &[],
        }
    }
}

/// Input for the RunPipeline use case
#[derive(Debug, Clone)]
pub struct RunPipelineInput {
    pub request: GenerationRequest,
    /// Provider assignments; several entries for one phase form an ensemble
    pub phase_configs: Vec<PhaseConfig>,
}

impl RunPipelineInput {
    pub fn new(request: GenerationRequest, phase_configs: Vec<PhaseConfig>) -> Self {
        Self {
            request,
            phase_configs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// At least one call produced a candidate
    Completed,
    /// Every call failed; the prior phase's candidates were carried forward
    PassedThrough,
    /// The deadline or cancellation cut the phase short
    Interrupted,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Completed => "completed",
            PhaseStatus::PassedThrough => "passed_through",
            PhaseStatus::Interrupted => "interrupted",
        }
    }
}

/// What happened in one phase
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: PhaseId,
    pub attempted: usize,
    pub succeeded: usize,
    pub status: PhaseStatus,
    pub duration_ms: u64,
}

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub session_id: String,
    pub ranked: Vec<ScoredCandidate>,
    /// Every candidate generated during the run, with parent links
    pub arena: CandidateArena,
    pub phase_reports: Vec<PhaseReport>,
    pub model_version: u64,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Deadline,
    Cancelled,
}

/// One provider call scheduled in a stage
struct StageTask {
    config: PhaseConfig,
    parent: Option<Candidate>,
}

#[derive(Default)]
struct StageResult {
    produced: Vec<Candidate>,
    attempted: HashMap<PhaseId, usize>,
    succeeded: HashMap<PhaseId, usize>,
    errors: Vec<String>,
    interrupted: Option<Interrupt>,
}

impl StageResult {
    fn record(
        &mut self,
        config: &PhaseConfig,
        result: Result<Candidate, PhaseError>,
        stats: &mut ProviderStats,
        progress: &dyn ProgressNotifier,
    ) {
        let success = result.is_ok();
        *self.attempted.entry(config.phase).or_default() += 1;
        stats.record(&config.provider, success);
        progress.on_task_complete(config.phase, &config.provider, success);

        match result {
            Ok(candidate) => {
                *self.succeeded.entry(config.phase).or_default() += 1;
                self.produced.push(candidate);
            }
            Err(e) => self.errors.push(format!("{}: {}", config.provider, e)),
        }
    }
}

/// Per-provider attempt/success counts for the current run
#[derive(Debug, Default)]
struct ProviderStats {
    counts: HashMap<ProviderId, (usize, usize)>,
}

impl ProviderStats {
    fn record(&mut self, provider: &ProviderId, success: bool) {
        let entry = self.counts.entry(provider.clone()).or_default();
        entry.0 += 1;
        if success {
            entry.1 += 1;
        }
    }

    /// Laplace-smoothed success rate per provider
    fn reliability(&self) -> HashMap<ProviderId, f64> {
        self.counts
            .iter()
            .map(|(id, (attempts, successes))| {
                (id.clone(), (*successes as f64 + 1.0) / (*attempts as f64 + 2.0))
            })
            .collect()
    }
}

/// Group the phase sequence into execution stages.
///
/// With parallel execution, the leading run of independent phases forms a
/// single stage. Every dependent phase is its own stage.
fn plan_stages(phases: &[PhaseId], parallel: bool) -> Vec<Vec<PhaseId>> {
    let mut stages: Vec<Vec<PhaseId>> = Vec::new();
    for &phase in phases {
        let joins_leading = parallel
            && !phase.depends_on_prior()
            && stages.len() == 1
            && stages[0].iter().all(|p| !p.depends_on_prior());
        if joins_leading {
            stages[0].push(phase);
        } else {
            stages.push(vec![phase]);
        }
    }
    stages
}

/// Use case for running the generation pipeline
pub struct RunPipelineUseCase {
    executor: Arc<PhaseExecutor>,
    ranking: RankingEngine,
    feedback: Arc<FeedbackStore>,
    settings: PipelineSettings,
    sink: Arc<dyn ObservabilitySink>,
    repository: Option<Arc<dyn CandidateRepository>>,
}

impl RunPipelineUseCase {
    pub fn new(
        executor: Arc<PhaseExecutor>,
        ranking: RankingEngine,
        feedback: Arc<FeedbackStore>,
        settings: PipelineSettings,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self {
            executor,
            ranking,
            feedback,
            settings,
            sink,
            repository: None,
        }
    }

    pub fn with_repository(mut self, repository: Option<Arc<dyn CandidateRepository>>) -> Self {
        self.repository = repository;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Execute the use case with default (no-op) progress and no external cancellation
    pub async fn execute(&self, input: RunPipelineInput) -> Result<PipelineOutput, PipelineError> {
        self.execute_with_progress(input, &NoProgress, CancellationToken::new())
            .await
    }

    /// Execute the use case with progress callbacks and a cancellation token
    pub async fn execute_with_progress(
        &self,
        input: RunPipelineInput,
        progress: &dyn ProgressNotifier,
        cancel: CancellationToken,
    ) -> Result<PipelineOutput, PipelineError> {
        let RunPipelineInput {
            request,
            phase_configs,
        } = input;
        let configs_by_phase = self.validate(&request, &phase_configs)?;

        let started = Instant::now();
        let budget = request.deadline().unwrap_or(self.settings.deadline);
        let deadline = tokio::time::Instant::now() + budget;
        let run_token = cancel.child_token();
        let request = Arc::new(request);

        let stages = plan_stages(request.phases(), self.settings.features.parallel_phases);
        info!(
            "Starting pipeline {} with {} phase(s) in {} stage(s), deadline {}ms",
            request.session_id(),
            request.phases().len(),
            stages.len(),
            budget.as_millis()
        );

        let mut arena = CandidateArena::new();
        let mut frontier: Vec<CandidateId> = Vec::new();
        let mut stats = ProviderStats::default();
        let mut reports = Vec::new();

        for (index, stage) in stages.iter().enumerate() {
            let stage_started = Instant::now();
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let share = remaining / (stages.len() - index) as u32;
            let attempt_timeout = self.settings.attempt_timeout(share);

            let parents: Vec<Candidate> = frontier
                .iter()
                .filter_map(|id| arena.get(id).cloned())
                .collect();
            let mut tasks = Vec::new();
            for phase in stage {
                let configs = configs_by_phase.get(phase).map(Vec::as_slice).unwrap_or(&[]);
                let before = tasks.len();
                for config in configs {
                    if phase.depends_on_prior() && !parents.is_empty() {
                        tasks.extend(parents.iter().map(|parent| StageTask {
                            config: config.clone(),
                            parent: Some(parent.clone()),
                        }));
                    } else {
                        tasks.push(StageTask {
                            config: config.clone(),
                            parent: None,
                        });
                    }
                }
                info!("Phase {}: {} provider call(s)", phase, tasks.len() - before);
                progress.on_phase_start(*phase, tasks.len() - before);
            }

            let result = self
                .run_stage(tasks, &request, attempt_timeout, deadline, &cancel, &run_token, &mut stats, progress)
                .await;

            let mut produced = Vec::with_capacity(result.produced.len());
            for candidate in &result.produced {
                match arena.insert(candidate.clone()) {
                    Ok(id) => produced.push(id),
                    Err(e) => warn!("Dropping candidate {}: {}", candidate.id, e),
                }
            }

            for phase in stage {
                let produced_here = result.succeeded.get(phase).copied().unwrap_or(0);
                let status = if result.interrupted.is_some() {
                    PhaseStatus::Interrupted
                } else if produced_here == 0 {
                    PhaseStatus::PassedThrough
                } else {
                    PhaseStatus::Completed
                };
                let report = PhaseReport {
                    phase: *phase,
                    attempted: result.attempted.get(phase).copied().unwrap_or(0),
                    succeeded: produced_here,
                    status,
                    duration_ms: stage_started.elapsed().as_millis() as u64,
                };
                self.sink.emit(
                    ObservabilityEvent::new(EventType::PhaseOutcome, status.as_str())
                        .with_phase(*phase)
                        .with_duration(stage_started.elapsed())
                        .with_tokens(
                            result
                                .produced
                                .iter()
                                .filter(|c| c.phase == *phase)
                                .map(|c| c.tokens_used)
                                .sum(),
                        ),
                );
                progress.on_phase_complete(*phase, produced_here);
                reports.push(report);
            }

            if let Some(interrupt) = result.interrupted {
                let survivors = Self::merge_partial(&arena, &frontier, &produced);
                warn!(
                    "Pipeline {} interrupted ({:?}) with {} candidate(s) in hand",
                    request.session_id(),
                    interrupt,
                    survivors.len()
                );
                let partial = self
                    .finish_ranking(&request, &arena, &survivors, &stats, None)
                    .await;
                self.persist(&request, &arena, &partial).await;
                return Err(match interrupt {
                    Interrupt::Deadline => PipelineError::Timeout {
                        elapsed: started.elapsed(),
                        partial,
                    },
                    Interrupt::Cancelled => PipelineError::Cancelled { partial },
                });
            }

            if produced.is_empty() {
                let reason = if result.errors.is_empty() {
                    "no provider calls were made".to_string()
                } else {
                    result.errors.join("; ")
                };
                if frontier.is_empty() {
                    return Err(PipelineError::NoCandidates {
                        phase: stage[0],
                        reason,
                    });
                }
                warn!(
                    "Phase {} produced nothing, carrying {} candidate(s) forward: {}",
                    stage[0],
                    frontier.len(),
                    reason
                );
            } else {
                frontier = produced;
            }
        }

        let ranked = self
            .finish_ranking(
                &request,
                &arena,
                &frontier,
                &stats,
                Some(EmbeddingQuery::new(request.input()).until(deadline).cancelled_by(&run_token)),
            )
            .await;
        progress.on_ranking_complete(ranked.len());
        self.persist(&request, &arena, &ranked).await;

        info!(
            "Pipeline {} finished in {}ms: {} generated, {} selected",
            request.session_id(),
            started.elapsed().as_millis(),
            arena.len(),
            ranked.len()
        );

        Ok(PipelineOutput {
            session_id: request.session_id().to_string(),
            model_version: ranked
                .first()
                .map(|s| s.model_version)
                .unwrap_or_else(|| self.feedback.current_model().version()),
            ranked,
            arena,
            phase_reports: reports,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Check the request and phase setup, grouping configs by phase.
    fn validate(
        &self,
        request: &GenerationRequest,
        phase_configs: &[PhaseConfig],
    ) -> Result<HashMap<PhaseId, Vec<PhaseConfig>>, PipelineError> {
        request
            .validate()
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        if request.phases().is_empty() {
            return Err(PipelineError::Configuration(
                DomainError::EmptyPhaseSequence.to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for phase in request.phases() {
            if !seen.insert(*phase) {
                return Err(PipelineError::Configuration(format!(
                    "phase {} appears more than once in the sequence",
                    phase
                )));
            }
        }

        let mut by_phase: HashMap<PhaseId, Vec<PhaseConfig>> = HashMap::new();
        for config in phase_configs {
            if !self.executor.registry().contains(&config.provider) {
                return Err(PipelineError::Configuration(format!(
                    "provider {} for phase {} is not registered",
                    config.provider, config.phase
                )));
            }
            if !seen.contains(&config.phase) {
                debug!("Ignoring config for phase {} not in the sequence", config.phase);
                continue;
            }
            by_phase.entry(config.phase).or_default().push(config.clone());
        }

        for phase in request.phases() {
            if !by_phase.contains_key(phase) {
                return Err(PipelineError::Configuration(format!(
                    "no provider configured for phase {}",
                    phase
                )));
            }
        }
        Ok(by_phase)
    }

    /// Run every call of one stage concurrently until all finish, the
    /// deadline passes, or the caller cancels.
    #[allow(clippy::too_many_arguments)]
    async fn run_stage(
        &self,
        tasks: Vec<StageTask>,
        request: &Arc<GenerationRequest>,
        attempt_timeout: Duration,
        deadline: tokio::time::Instant,
        cancel: &CancellationToken,
        run_token: &CancellationToken,
        stats: &mut ProviderStats,
        progress: &dyn ProgressNotifier,
    ) -> StageResult {
        let mut result = StageResult::default();
        let mut join_set = JoinSet::new();

        for task in tasks {
            let executor = Arc::clone(&self.executor);
            let request = Arc::clone(request);
            let token = run_token.clone();

            join_set.spawn(async move {
                let outcome = executor
                    .execute(&task.config, &request, task.parent.as_ref(), attempt_timeout, &token)
                    .await;
                (task.config, outcome)
            });
        }

        let expired = tokio::time::sleep_until(deadline);
        tokio::pin!(expired);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    result.interrupted = Some(Interrupt::Cancelled);
                    break;
                }
                _ = &mut expired => {
                    result.interrupted = Some(Interrupt::Deadline);
                    break;
                }
                joined = join_set.join_next() => match joined {
                    Some(Ok((config, outcome))) => result.record(&config, outcome, stats, progress),
                    Some(Err(e)) => warn!("Task join error: {}", e),
                    None => break,
                },
            }
        }

        if result.interrupted.is_some() {
            run_token.cancel();
            join_set.abort_all();
        }
        result
    }

    /// Candidates to rank after an interruption: what the cut-short stage
    /// produced, plus prior survivors that were not refined yet.
    fn merge_partial(
        arena: &CandidateArena,
        frontier: &[CandidateId],
        produced: &[CandidateId],
    ) -> Vec<CandidateId> {
        let refined: HashSet<CandidateId> = produced
            .iter()
            .filter_map(|id| arena.get(id).and_then(|c| c.parent))
            .collect();
        frontier
            .iter()
            .filter(|id| !refined.contains(id))
            .chain(produced.iter())
            .copied()
            .collect()
    }

    async fn finish_ranking(
        &self,
        request: &GenerationRequest,
        arena: &CandidateArena,
        survivors: &[CandidateId],
        stats: &ProviderStats,
        embeddings: Option<EmbeddingQuery<'_>>,
    ) -> Vec<ScoredCandidate> {
        let candidates: Vec<Candidate> = survivors
            .iter()
            .filter_map(|id| arena.get(id).cloned())
            .collect();

        let mut context = RankingContext::new(request.phases().len());
        context.provider_reliability = stats.reliability();
        context.chain_lengths = candidates
            .iter()
            .map(|c| (c.id, arena.chain_len(&c.id)))
            .collect();

        let model = self.feedback.current_model();
        let ranked = self
            .ranking
            .rank(
                &candidates,
                context,
                &model,
                request.count(),
                embeddings,
            )
            .await;
        self.feedback.observe_ranking(&ranked);
        ranked
    }

    /// Persistence failures are logged and never fail the run.
    async fn persist(
        &self,
        request: &GenerationRequest,
        arena: &CandidateArena,
        ranked: &[ScoredCandidate],
    ) {
        let Some(repository) = &self.repository else {
            return;
        };
        let candidates: Vec<Candidate> = arena.iter().cloned().collect();
        if let Err(e) = repository
            .save_candidates(request.session_id(), &candidates)
            .await
        {
            warn!("Failed to save candidates: {}", e);
        }

        let model_version = ranked
            .first()
            .map(|s| s.model_version)
            .unwrap_or_else(|| self.feedback.current_model().version());
        let selection = SelectionRecord::new(request.session_id(), model_version, ranked);
        if let Err(e) = repository.save_selection(&selection).await {
            warn!("Failed to save selection: {}", e);
        }
    }
}
