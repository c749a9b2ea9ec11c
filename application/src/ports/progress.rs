//! Progress notification port
//!
//! Defines the interface for reporting progress during a pipeline run.

use alchemy_domain::{PhaseId, ProviderId};

/// Callback for progress updates during pipeline execution
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (spinners, plain log lines, etc.)
pub trait ProgressNotifier: Send + Sync {
    /// Called when a phase starts
    fn on_phase_start(&self, phase: PhaseId, total_tasks: usize);

    /// Called when a provider call completes within a phase
    fn on_task_complete(&self, phase: PhaseId, provider: &ProviderId, success: bool);

    /// Called when a phase completes
    fn on_phase_complete(&self, phase: PhaseId, produced: usize);

    /// Called once the survivors have been ranked
    fn on_ranking_complete(&self, _selected: usize) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_phase_start(&self, _phase: PhaseId, _total_tasks: usize) {}
    fn on_task_complete(&self, _phase: PhaseId, _provider: &ProviderId, _success: bool) {}
    fn on_phase_complete(&self, _phase: PhaseId, _produced: usize) {}
}
