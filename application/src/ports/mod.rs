//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod embedding;
pub mod observability;
pub mod persistence;
pub mod progress;
pub mod provider;
pub mod template_renderer;
