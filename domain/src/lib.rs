//! Domain layer for prompt-alchemy
//!
//! This crate contains the core types and pure algorithms. It has no
//! dependencies on async runtimes, I/O or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Phases
//!
//! A run transforms an input through a sequence of phases:
//!
//! - **Prima Materia**: structure the raw input into a first prompt
//! - **Solutio**: dissolve it into natural, human language
//! - **Coagulatio**: crystallize it into a precise final form
//!
//! ## Candidates
//!
//! Every provider call yields a [`Candidate`]. Refined candidates keep an id
//! link to their parent, forming a forest held in a [`CandidateArena`].
//!
//! ## Ranking and learning
//!
//! Terminal candidates are scored by a [`RankingModel`] snapshot and
//! [`rank`]ed deterministically. [`OutcomeSignal`]s paired with ranking
//! features drive [`retrain`], which yields the next snapshot.

pub mod core;
pub mod generation;
pub mod learning;
pub mod phase;
pub mod prompt;
pub mod ranking;

// Re-export commonly used types
pub use core::{error::DomainError, string::normalize_text};
pub use generation::{Candidate, CandidateArena, CandidateId, DEFAULT_COUNT, GenerationRequest};
pub use learning::{LearningParams, OutcomeSignal, Signal, TrainingSample, retrain};
pub use phase::{PhaseConfig, PhaseId, ProviderId};
pub use prompt::{PhaseHints, PromptTemplate, PromptVariables};
pub use ranking::{
    DEFAULT_RELIABILITY, Feature, FeatureVector, RankingContext, RankingModel, ScoredCandidate,
    default_weights, rank,
};
