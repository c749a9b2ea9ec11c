//! Progress reporting for pipeline runs

use alchemy_application::ProgressNotifier;
use alchemy_domain::{PhaseId, ProviderId};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Reports progress with one bar per running phase.
///
/// Independent phases may run concurrently, so bars are keyed by phase.
pub struct ProgressReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<PhaseId, ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_phase_start(&self, phase: PhaseId, total_tasks: usize) {
        let pb = self.multi.add(ProgressBar::new(total_tasks as u64));
        pb.set_style(Self::phase_style());
        pb.set_prefix(phase.display_name());
        pb.set_message("Starting...");

        self.bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(phase, pb);
    }

    fn on_task_complete(&self, phase: PhaseId, provider: &ProviderId, success: bool) {
        let bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pb) = bars.get(&phase) {
            let status = if success {
                format!("{} {}", "v".green(), provider)
            } else {
                format!("{} {}", "x".red(), provider)
            };
            pb.set_message(status);
            pb.inc(1);
        }
    }

    fn on_phase_complete(&self, phase: PhaseId, produced: usize) {
        let bar = self
            .bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&phase);
        if let Some(pb) = bar {
            pb.finish_with_message(format!(
                "{} ({} candidates)",
                "complete".green(),
                produced
            ));
        }
    }

    fn on_ranking_complete(&self, selected: usize) {
        let _ = self
            .multi
            .println(format!("{} ranked {} candidate(s)", "->".cyan(), selected));
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_phase_start(&self, phase: PhaseId, total_tasks: usize) {
        eprintln!(
            "{} {} ({} tasks)",
            "->".cyan(),
            phase.display_name().bold(),
            total_tasks
        );
    }

    fn on_task_complete(&self, _phase: PhaseId, provider: &ProviderId, success: bool) {
        if success {
            eprintln!("  {} {}", "v".green(), provider);
        } else {
            eprintln!("  {} {} (failed)", "x".red(), provider);
        }
    }

    fn on_phase_complete(&self, _phase: PhaseId, produced: usize) {
        eprintln!("  {} candidate(s)", produced);
    }
}
