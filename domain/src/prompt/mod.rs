//! Prompt templates and input hints for the generation phases.

pub mod hints;
pub mod template;

pub use hints::PhaseHints;
pub use template::{PromptTemplate, PromptVariables};
