//! Built-in prompt templates for each phase
//!
//! Templates use `{{NAME}}` placeholders filled from [`PromptVariables`].

use super::hints::PhaseHints;
use crate::phase::PhaseId;
use serde::{Deserialize, Serialize};

/// Values available to phase templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptVariables {
    pub phase: PhaseId,
    /// The caller's original input
    pub input: String,
    /// Text of the prior-phase candidate being refined (non-initial phases)
    pub prompt: Option<String>,
    pub persona: Option<String>,
    pub hints: PhaseHints,
    /// Additional context lines (request tags)
    pub context: Vec<String>,
}

impl PromptVariables {
    pub fn new(phase: PhaseId, input: impl Into<String>) -> Self {
        let input = input.into();
        Self {
            phase,
            hints: PhaseHints::extract(&input),
            input,
            prompt: None,
            persona: None,
            context: Vec::new(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_persona(mut self, persona: Option<String>) -> Self {
        self.persona = persona;
        self
    }

    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }

    /// Placeholder name/value pairs
    pub fn placeholders(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("INPUT", self.input.as_str()),
            ("PROMPT", self.prompt.as_deref().unwrap_or(self.input.as_str())),
            ("PERSONA", self.persona.as_deref().unwrap_or("")),
            ("TYPE", self.hints.content_type.as_str()),
            ("AUDIENCE", self.hints.audience.as_str()),
            ("TONE", self.hints.tone.as_str()),
            ("THEME", self.hints.theme.as_str()),
        ]
    }
}

/// Templates for generating requests at each phase
pub struct PromptTemplate;

impl PromptTemplate {
    fn base_system() -> &'static str {
        "You are a master alchemist of language, transforming raw ideas into golden prompts."
    }

    /// System preamble for a phase
    pub fn system(phase: PhaseId) -> String {
        let task = match phase {
            PhaseId::PrimaMateria => {
                "In this Prima Materia phase, analyze the raw request and shape it into a comprehensive, well-structured prompt that clearly defines the task and the expected output."
            }
            PhaseId::Solutio => {
                "In this Solutio phase, dissolve rigid structure into flowing, natural language that feels human while keeping its purpose clear."
            }
            PhaseId::Coagulatio => {
                "In this Coagulatio phase, crystallize the prompt into its most potent form: precise, free of redundancy and efficient with tokens."
            }
        };
        format!("{} {}", Self::base_system(), task)
    }

    /// Body template for a phase, with placeholders
    pub fn body(phase: PhaseId) -> &'static str {
        match phase {
            PhaseId::PrimaMateria => {
                r#"Create a comprehensive prompt that generates {{TYPE}} for {{AUDIENCE}}, using a {{TONE}}, focusing on {{THEME}}.

Requirements:
- Be specific and detailed
- Include clear instructions
- Define the expected output format
- Consider edge cases

User Input: {{INPUT}}"#
            }
            PhaseId::Solutio => {
                r#"Take this prompt and rewrite it so it reads naturally and resonates with a human reader.

Material to Dissolve:
{{PROMPT}}

Requirements:
- Dissolve formality into natural flow
- Add specific examples where helpful
- Keep clarity and flow
- Preserve the original intent"#
            }
            PhaseId::Coagulatio => {
                r#"Refine this prompt for maximum effectiveness and output clarity.

Solution to Crystallize:
{{PROMPT}}

Requirements:
- Distill to the essential instructions
- Remove redundancy
- Strengthen the structure
- Optimize for token efficiency"#
            }
        }
    }

    /// Replace every `{{NAME}}` placeholder in `template`.
    pub fn fill(template: &str, vars: &PromptVariables) -> String {
        vars.placeholders()
            .into_iter()
            .fold(template.to_string(), |acc, (name, value)| {
                acc.replace(&format!("{{{{{}}}}}", name), value)
            })
    }

    /// Full request text: system preamble, filled body, persona and context.
    pub fn compose(system: &str, body: &str, vars: &PromptVariables) -> String {
        let mut prompt = format!("{}\n\n{}", system, Self::fill(body, vars));

        if let Some(persona) = vars.persona.as_deref().filter(|p| !p.is_empty()) {
            prompt.push_str(&format!("\n\nWrite for the \"{}\" persona.", persona));
        }

        if !vars.context.is_empty() {
            prompt.push_str("\n\nAdditional Context:\n");
            for line in &vars.context {
                prompt.push_str(&format!("- {}\n", line));
            }
        }

        prompt
    }

    /// Render the built-in template for `vars.phase`.
    pub fn render(vars: &PromptVariables) -> String {
        Self::compose(&Self::system(vars.phase), Self::body(vars.phase), vars)
    }
}
