//! Template renderer port
//!
//! Turns a phase and its variables into the final prompt text.

use alchemy_domain::{PhaseId, PromptVariables};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("No template found for phase {0}")]
    NotFound(PhaseId),

    #[error("Failed to render template for phase {phase}: {reason}")]
    Render { phase: PhaseId, reason: String },
}

/// Renders the prompt sent to a provider for one phase call
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, vars: &PromptVariables) -> Result<String, TemplateError>;
}

/// Renderer backed only by the compiled-in templates
pub struct BuiltinTemplates;

impl TemplateRenderer for BuiltinTemplates {
    fn render(&self, vars: &PromptVariables) -> Result<String, TemplateError> {
        Ok(alchemy_domain::PromptTemplate::render(vars))
    }
}
