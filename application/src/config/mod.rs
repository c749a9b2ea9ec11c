//! Application-level configuration.
//!
//! This module provides configuration types that control how use cases behave:
//!
//! - [`PipelineSettings`]: run-level knobs (count, deadline, timeouts) and feature toggles
//! - [`RetryPolicy`]: bounded retries with backoff for provider calls

pub mod pipeline_settings;
pub mod retry_policy;

pub use pipeline_settings::{FeatureToggles, PipelineSettings};
pub use retry_policy::RetryPolicy;
