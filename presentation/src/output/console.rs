//! Console output formatter for pipeline results

use crate::output::formatter::OutputFormatter;
use alchemy_application::{PhaseReport, PhaseStatus, PipelineOutput};
use alchemy_domain::{CandidateArena, RankingModel, ScoredCandidate};
use colored::Colorize;

/// Formats pipeline results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete result
    pub fn format(output: &PipelineOutput) -> String {
        let mut out = String::new();

        out.push_str(&Self::header("Prompt Alchemy Results"));
        out.push('\n');

        out.push_str(&format!(
            "{} {}\n",
            "Session:".cyan().bold(),
            output.session_id
        ));
        out.push_str(&format!(
            "{} v{}   {} {}ms\n",
            "Model:".cyan().bold(),
            output.model_version,
            "Elapsed:".cyan().bold(),
            output.elapsed_ms
        ));

        out.push_str(&Self::section_header("Phases"));
        for report in &output.phase_reports {
            out.push_str(&Self::phase_line(report));
        }

        out.push_str(&Self::section_header("Ranked Candidates"));
        out.push_str(&Self::format_ranked(&output.ranked, Some(&output.arena)));

        out.push_str(&Self::footer());
        out
    }

    /// Format as JSON
    pub fn format_json(output: &PipelineOutput) -> String {
        serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
    }

    /// Selected texts only, separated by blank lines
    pub fn format_text(output: &PipelineOutput) -> String {
        output
            .ranked
            .iter()
            .map(|scored| scored.candidate.text.trim())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Ranked candidates with score breakdowns.
    ///
    /// When the arena is given, each candidate's refinement chain is shown.
    pub fn format_ranked(ranked: &[ScoredCandidate], arena: Option<&CandidateArena>) -> String {
        if ranked.is_empty() {
            return format!("\n{}\n", "No candidates.".dimmed());
        }

        let mut out = String::new();
        for scored in ranked {
            let candidate = &scored.candidate;
            out.push_str(&format!(
                "\n{}\n",
                format!(
                    "── #{} score {:.3} ── {} / {} ──",
                    scored.rank_position, scored.score, candidate.provider, candidate.model
                )
                .yellow()
                .bold()
            ));
            out.push_str(&format!("{} {}\n", "id:".dimmed(), candidate.id));

            if let Some(arena) = arena {
                let chain: Vec<String> = arena
                    .chain(&candidate.id)
                    .iter()
                    .map(|c| c.phase.as_str().to_string())
                    .collect();
                if chain.len() > 1 {
                    out.push_str(&format!("{} {}\n", "chain:".dimmed(), chain.join(" -> ")));
                }
            }

            let breakdown: Vec<String> = scored
                .breakdown
                .iter()
                .map(|(feature, value)| format!("{}={:.3}", feature, value))
                .collect();
            out.push_str(&format!("{} {}\n\n", "features:".dimmed(), breakdown.join(" ")));
            out.push_str(&Self::indent(candidate.text.trim(), "  "));
            out.push('\n');
        }
        out
    }

    /// Feature weights of a ranking model
    pub fn format_model(model: &RankingModel) -> String {
        let mut out = format!(
            "{} v{} ({} training samples)\n",
            "Ranking model".cyan().bold(),
            model.version(),
            model.training_sample_count()
        );
        for (feature, weight) in model.weights() {
            out.push_str(&format!("  {:<24} {:.4}\n", feature.to_string(), weight));
        }
        out
    }

    fn phase_line(report: &PhaseReport) -> String {
        let status = match report.status {
            PhaseStatus::Completed => report.status.as_str().green(),
            PhaseStatus::PassedThrough => report.status.as_str().yellow(),
            PhaseStatus::Interrupted => report.status.as_str().red(),
        };
        format!(
            "  {:<14} {:>2}/{:<2} calls  {:<14} {}ms\n",
            report.phase.display_name(),
            report.succeeded,
            report.attempted,
            status,
            report.duration_ms
        )
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, output: &PipelineOutput) -> String {
        Self::format(output)
    }

    fn format_json(&self, output: &PipelineOutput) -> String {
        Self::format_json(output)
    }

    fn format_text(&self, output: &PipelineOutput) -> String {
        Self::format_text(output)
    }
}
