//! Generation requests and the candidates a run produces.

pub mod arena;
pub mod candidate;
pub mod request;

pub use arena::CandidateArena;
pub use candidate::{Candidate, CandidateId};
pub use request::{DEFAULT_COUNT, GenerationRequest};
