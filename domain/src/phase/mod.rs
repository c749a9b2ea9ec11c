//! Pipeline phases and their provider configuration.

pub mod entities;

pub use entities::{PhaseConfig, PhaseId, ProviderId};
