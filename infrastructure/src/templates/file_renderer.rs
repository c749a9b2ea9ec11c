//! Template renderer with on-disk overrides.
//!
//! Looks for `<dir>/<phase-id>.tmpl` files (e.g. `solutio.tmpl`). An override
//! replaces the phase body; the system preamble, persona line and context
//! list are still added around it. Phases without an override use the
//! compiled-in template unless the built-in fallback is disabled.

use alchemy_application::{TemplateError, TemplateRenderer};
use alchemy_domain::{PhaseId, PromptTemplate, PromptVariables};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct FileTemplateRenderer {
    overrides: HashMap<PhaseId, String>,
    builtin_fallback: bool,
}

impl FileTemplateRenderer {
    /// Renderer with no overrides
    pub fn builtin() -> Self {
        Self {
            overrides: HashMap::new(),
            builtin_fallback: true,
        }
    }

    /// Load overrides from `dir`. A missing directory yields no overrides.
    pub fn load(dir: &Path) -> std::io::Result<Self> {
        let mut overrides = HashMap::new();
        if dir.is_dir() {
            for phase in PhaseId::default_sequence() {
                let path = Self::template_path(dir, phase);
                if path.is_file() {
                    let body = std::fs::read_to_string(&path)?;
                    debug!("Loaded template override {}", path.display());
                    overrides.insert(phase, body);
                }
            }
            info!(
                "Loaded {} template override(s) from {}",
                overrides.len(),
                dir.display()
            );
        } else {
            debug!("Template directory {} does not exist", dir.display());
        }
        Ok(Self {
            overrides,
            builtin_fallback: true,
        })
    }

    /// Only render phases that have an override
    pub fn without_builtin_fallback(mut self) -> Self {
        self.builtin_fallback = false;
        self
    }

    pub fn template_path(dir: &Path, phase: PhaseId) -> PathBuf {
        dir.join(format!("{}.tmpl", phase.as_str()))
    }

    pub fn has_override(&self, phase: PhaseId) -> bool {
        self.overrides.contains_key(&phase)
    }
}

impl TemplateRenderer for FileTemplateRenderer {
    fn render(&self, vars: &PromptVariables) -> Result<String, TemplateError> {
        match self.overrides.get(&vars.phase) {
            Some(body) => Ok(PromptTemplate::compose(
                &PromptTemplate::system(vars.phase),
                body,
                vars,
            )),
            None if self.builtin_fallback => Ok(PromptTemplate::render(vars)),
            None => Err(TemplateError::NotFound(vars.phase)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_renders_every_phase() {
        let renderer = FileTemplateRenderer::builtin();
        for phase in PhaseId::default_sequence() {
            let vars = PromptVariables::new(phase, "an idea");
            assert!(renderer.render(&vars).is_ok());
        }
    }

    #[test]
    fn test_override_replaces_body() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            FileTemplateRenderer::template_path(dir.path(), PhaseId::Solutio),
            "Make this friendlier for {{AUDIENCE}}: {{PROMPT}}",
        )
        .unwrap();

        let renderer = FileTemplateRenderer::load(dir.path()).unwrap();
        assert!(renderer.has_override(PhaseId::Solutio));
        assert!(!renderer.has_override(PhaseId::Coagulatio));

        let vars = PromptVariables::new(PhaseId::Solutio, "email for developer team")
            .with_prompt("Draft prompt")
            .with_context(vec!["keep it short".to_string()]);
        let rendered = renderer.render(&vars).unwrap();

        assert!(rendered.contains("Make this friendlier for developers: Draft prompt"));
        assert!(rendered.contains("Additional Context:\n- keep it short"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn test_missing_template_without_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FileTemplateRenderer::load(dir.path())
            .unwrap()
            .without_builtin_fallback();

        let vars = PromptVariables::new(PhaseId::Coagulatio, "x");
        assert_eq!(
            renderer.render(&vars),
            Err(TemplateError::NotFound(PhaseId::Coagulatio))
        );
    }

    #[test]
    fn test_missing_directory_is_not_an_error() {
        let renderer = FileTemplateRenderer::load(Path::new("/definitely/not/here")).unwrap();
        assert!(!renderer.has_override(PhaseId::PrimaMateria));
    }
}
