//! Prompt template loading

mod file_renderer;

pub use file_renderer::FileTemplateRenderer;
