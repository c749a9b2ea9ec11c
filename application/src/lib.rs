//! Application layer for prompt-alchemy
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{FeatureToggles, PipelineSettings, RetryPolicy};
pub use ports::{
    embedding::EmbeddingPort,
    observability::{EventType, NoObservability, ObservabilityEvent, ObservabilitySink},
    persistence::{
        CandidateRepository, FeedbackRepository, RepositoryError, SelectionEntry, SelectionRecord,
    },
    progress::{NoProgress, ProgressNotifier},
    provider::{
        ProviderError, ProviderErrorKind, ProviderPort, ProviderRegistry, ProviderRequest,
        ProviderResponse,
    },
    template_renderer::{BuiltinTemplates, TemplateError, TemplateRenderer},
};
pub use use_cases::execute_phase::{PhaseError, PhaseExecutor};
pub use use_cases::feedback_store::FeedbackStore;
pub use use_cases::rank_candidates::{EmbeddingQuery, RankingEngine};
pub use use_cases::run_pipeline::{
    PhaseReport, PhaseStatus, PipelineError, PipelineOutput, RunPipelineInput, RunPipelineUseCase,
};
