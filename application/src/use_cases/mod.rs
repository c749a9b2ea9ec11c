//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod execute_phase;
pub mod feedback_store;
pub mod rank_candidates;
pub mod run_pipeline;
