//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Phase sequence is empty")]
    EmptyPhaseSequence,

    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Unknown outcome signal: {0}")]
    UnknownSignal(String),

    #[error("Ranking model weights cannot be empty")]
    EmptyWeights,

    #[error("Invalid weight for {feature}: {value}")]
    InvalidWeight { feature: String, value: f64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Candidate {candidate} references unknown parent {parent}")]
    UnknownParent { candidate: String, parent: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DomainError::EmptyPhaseSequence.to_string(),
            "Phase sequence is empty"
        );
        assert_eq!(
            DomainError::UnknownPhase("nigredo".to_string()).to_string(),
            "Unknown phase: nigredo"
        );
    }

    #[test]
    fn test_invalid_weight_display() {
        let error = DomainError::InvalidWeight {
            feature: "lexical_diversity".to_string(),
            value: f64::NAN,
        };
        assert!(error.to_string().starts_with("Invalid weight for lexical_diversity"));
    }
}
