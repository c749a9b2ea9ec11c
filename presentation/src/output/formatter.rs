//! Output formatter trait

use alchemy_application::PipelineOutput;

/// Trait for formatting pipeline results
pub trait OutputFormatter {
    /// Format the complete result
    fn format(&self, output: &PipelineOutput) -> String;

    /// Format as JSON
    fn format_json(&self, output: &PipelineOutput) -> String;

    /// Format the selected texts only
    fn format_text(&self, output: &PipelineOutput) -> String;
}
