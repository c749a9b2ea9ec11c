//! CLI command definitions

use alchemy_domain::{CandidateId, PhaseId, Signal};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for generation results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Ranked candidates with scores, phase reports and lineage
    Full,
    /// Only the selected texts
    Text,
    /// JSON output
    Json,
}

/// CLI arguments for prompt-alchemy
#[derive(Parser, Debug)]
#[command(name = "prompt-alchemy")]
#[command(author, version, about = "Transmute raw ideas into ranked, refined prompts")]
#[command(long_about = r#"
Prompt Alchemy runs an input through a sequence of phases, each backed by one
or more LLM providers, and ranks the results with a model that learns from
your feedback.

The default phases are:
1. Prima Materia: structure the raw idea into a comprehensive prompt
2. Solutio: dissolve it into natural, human language
3. Coagulatio: crystallize it into a precise, optimized prompt

Configuration files are loaded from (in priority order):
1. ALCHEMY_* environment variables
2. --config <path>      Explicit config file
3. ./alchemy.toml       Project-level config
4. ~/.config/prompt-alchemy/config.toml   Global config

Example:
  prompt-alchemy generate "A landing page for a hiking app"
  prompt-alchemy generate --phase idea --phase human -n 5 "Release notes for v2"
  prompt-alchemy feedback 6f1c... accepted
  prompt-alchemy retrain --watch
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration sources and the effective configuration, then exit
    #[arg(long, global = true)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate ranked prompt candidates from an input
    Generate(GenerateArgs),

    /// Record what happened to a generated candidate
    Feedback {
        /// Candidate id as printed by `generate`
        candidate_id: CandidateId,

        /// accepted, rejected, edited or unused
        signal: Signal,
    },

    /// Retrain the ranking model from persisted selections and feedback
    Retrain {
        /// Keep retraining on the configured interval until interrupted
        #[arg(long)]
        watch: bool,
    },
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// The raw input to transform
    pub input: String,

    /// Phases to run, in order (defaults to the configured sequence)
    #[arg(short, long = "phase", value_name = "PHASE")]
    pub phases: Vec<PhaseId>,

    /// Number of candidates to return
    #[arg(short = 'n', long, value_name = "N")]
    pub count: Option<usize>,

    /// Persona the prompt should be written for
    #[arg(long)]
    pub persona: Option<String>,

    /// Extra context tags (can be specified multiple times)
    #[arg(short, long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Overall deadline in seconds
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Run each phase as its own stage, one after another
    #[arg(long)]
    pub sequential: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "full")]
    pub output: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate_with_options() {
        let cli = Cli::try_parse_from([
            "prompt-alchemy",
            "-vv",
            "generate",
            "--phase",
            "idea",
            "--phase",
            "solutio",
            "-n",
            "5",
            "--tag",
            "marketing",
            "--sequential",
            "-o",
            "json",
            "write a tagline",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Some(Command::Generate(args)) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.input, "write a tagline");
        assert_eq!(args.phases, vec![PhaseId::PrimaMateria, PhaseId::Solutio]);
        assert_eq!(args.count, Some(5));
        assert_eq!(args.tags, vec!["marketing"]);
        assert!(args.sequential);
        assert_eq!(args.output, OutputFormat::Json);
    }

    #[test]
    fn test_parse_feedback() {
        let cli = Cli::try_parse_from([
            "prompt-alchemy",
            "feedback",
            "00000000-0000-4000-8000-000000000001",
            "accept",
        ])
        .unwrap();

        let Some(Command::Feedback {
            candidate_id,
            signal,
        }) = cli.command
        else {
            panic!("expected feedback");
        };
        assert_eq!(candidate_id.to_string(), "00000000-0000-4000-8000-000000000001");
        assert_eq!(signal, Signal::Accepted);
    }

    #[test]
    fn test_rejects_unknown_phase_and_signal() {
        assert!(Cli::try_parse_from(["prompt-alchemy", "generate", "--phase", "rubedo", "x"]).is_err());
        assert!(
            Cli::try_parse_from([
                "prompt-alchemy",
                "feedback",
                "00000000-0000-4000-8000-000000000001",
                "maybe"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["prompt-alchemy", "retrain", "--no-config", "-q"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Retrain { watch: false })));
        assert!(cli.no_config);
        assert!(cli.quiet);
    }
}
