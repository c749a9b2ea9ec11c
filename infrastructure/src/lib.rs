//! Infrastructure layer for prompt-alchemy
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: configuration file loading, HTTP provider
//! clients, template files, the JSONL event log and JSONL storage.

pub mod config;
pub mod logging;
pub mod providers;
pub mod storage;
pub mod templates;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use logging::{JsonlEventSink, TracingEventSink};
pub use providers::{
    OllamaEmbedding, OllamaProvider, OpenAiProvider, ProviderSetupError, build_embedding,
    build_registry,
};
pub use storage::{JsonlCandidateRepository, JsonlFeedbackRepository};
pub use templates::FileTemplateRenderer;
