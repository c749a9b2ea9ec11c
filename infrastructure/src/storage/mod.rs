//! File-backed persistence adapters.
//!
//! Everything lives under one data directory:
//!
//! - `candidates.jsonl`: every candidate produced, tagged with its session id
//! - `selections.jsonl`: the ranked selection of each run
//! - `outcomes.jsonl`: outcome signals, append-only
//! - `ranking_model.json`: the last published ranking model

mod candidates;
mod feedback;
mod jsonl;

pub use candidates::JsonlCandidateRepository;
pub use feedback::JsonlFeedbackRepository;
