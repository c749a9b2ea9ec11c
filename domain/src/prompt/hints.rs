//! Phase hints extracted from the raw input
//!
//! Keyword rules that give the first phase a content type, audience, tone
//! and theme to aim for.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseHints {
    pub content_type: String,
    pub audience: String,
    pub tone: String,
    pub theme: String,
}

impl PhaseHints {
    pub fn extract(input: &str) -> Self {
        let lower = input.to_lowercase();

        let content_type = if lower.contains("email") {
            "email content"
        } else if lower.contains("code") || lower.contains("function") {
            "code snippets"
        } else if lower.contains("article") {
            "article content"
        } else {
            "content"
        };

        let audience = if lower.contains("developer") {
            "developers"
        } else if lower.contains("business") {
            "business professionals"
        } else {
            "general audience"
        };

        let tone = if lower.contains("formal") {
            "formal tone"
        } else if lower.contains("casual") {
            "casual tone"
        } else {
            "professional tone"
        };

        Self {
            content_type: content_type.to_string(),
            audience: audience.to_string(),
            tone: tone.to_string(),
            theme: theme_of(input),
        }
    }
}

fn theme_of(input: &str) -> String {
    let words: Vec<&str> = input.split_whitespace().collect();
    if words.len() > 5 {
        format!("{}...", words[..5].join(" "))
    } else {
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_keywords() {
        let hints = PhaseHints::extract("Write a formal email for business partners");
        assert_eq!(hints.content_type, "email content");
        assert_eq!(hints.audience, "business professionals");
        assert_eq!(hints.tone, "formal tone");
        assert_eq!(hints.theme, "Write a formal email for...");
    }

    #[test]
    fn test_extract_defaults() {
        let hints = PhaseHints::extract("a poem");
        assert_eq!(hints.content_type, "content");
        assert_eq!(hints.audience, "general audience");
        assert_eq!(hints.tone, "professional tone");
        assert_eq!(hints.theme, "a poem");
    }
}
