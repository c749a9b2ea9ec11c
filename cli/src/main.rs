//! CLI entrypoint for Prompt Alchemy
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use alchemy_application::{
    CandidateRepository, FeedbackRepository, FeedbackStore, ObservabilitySink, PhaseExecutor,
    PipelineError, ProgressNotifier, RankingEngine, RunPipelineInput, RunPipelineUseCase,
    TemplateRenderer,
};
use alchemy_domain::{CandidateId, GenerationRequest, OutcomeSignal, Signal};
use alchemy_infrastructure::{
    ConfigLoader, FileConfig, FileTemplateRenderer, JsonlCandidateRepository,
    JsonlFeedbackRepository, JsonlEventSink, TracingEventSink, build_embedding, build_registry,
    logging::DEFAULT_CAPACITY,
};
use alchemy_presentation::{
    Cli, Command, ConsoleFormatter, GenerateArgs, OutputFormat, ProgressReporter, SimpleProgress,
};
use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser};
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// How long to wait for the event log to drain on exit
const EVENT_LOG_DRAIN: Duration = Duration::from_secs(2);

/// Everything a command needs, built once from the configuration
struct Services {
    config: FileConfig,
    sink: Arc<dyn ObservabilitySink>,
    candidates: Arc<JsonlCandidateRepository>,
    feedback_repo: Arc<JsonlFeedbackRepository>,
    feedback: Arc<FeedbackStore>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level; RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    if cli.show_config {
        ConfigLoader::print_config_sources();
        println!();
        println!("{}", config.to_toml().context("Failed to render configuration")?);
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    config.validate().context("Invalid configuration")?;
    info!("Starting Prompt Alchemy");

    // Ctrl-C cancels whatever is running; partial results are still reported
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted");
            ctrl_c.cancel();
        }
    });

    let (services, event_log) = build_services(config).await?;

    let result = match command {
        Command::Generate(args) => run_generate(&services, args, cli.quiet, cancel.clone()).await,
        Command::Feedback {
            candidate_id,
            signal,
        } => run_feedback(&services, candidate_id, signal).await,
        Command::Retrain { watch } => run_retrain(&services, watch, cancel.clone()).await,
    };

    // Every sink handle must be gone before the writer can finish
    drop(services);
    if let Some(handle) = event_log
        && tokio::time::timeout(EVENT_LOG_DRAIN, handle).await.is_err()
    {
        warn!("Event log did not drain in time");
    }

    result
}

async fn build_services(config: FileConfig) -> Result<(Services, Option<JoinHandle<()>>)> {
    // === Dependency Injection ===
    let (sink, event_log): (Arc<dyn ObservabilitySink>, _) = match &config.logging.events_file {
        Some(path) => match JsonlEventSink::spawn(path, DEFAULT_CAPACITY) {
            Some((sink, handle)) => {
                info!("Writing observability events to {}", sink.path().display());
                (Arc::new(sink), Some(handle))
            }
            None => (Arc::new(TracingEventSink), None),
        },
        None => (Arc::new(TracingEventSink), None),
    };

    let data_dir = config.storage.resolve_data_dir();
    info!("Using data directory {}", data_dir.display());
    let candidates = Arc::new(JsonlCandidateRepository::new(&data_dir));
    let feedback_repo = Arc::new(JsonlFeedbackRepository::new(&data_dir));

    let settings = config.pipeline_settings();
    let feedback = FeedbackStore::new(config.cold_start_model()?, config.learning.to_params())
        .with_learning(settings.features.learning)
        .with_sink(sink.clone());
    if let Err(e) = feedback
        .load_history(candidates.as_ref(), feedback_repo.as_ref())
        .await
    {
        warn!("Could not load feedback history: {}", e);
    }

    Ok((
        Services {
            config,
            sink,
            candidates,
            feedback_repo,
            feedback: Arc::new(feedback),
        },
        event_log,
    ))
}

fn build_pipeline(services: &Services, sequential: bool) -> Result<RunPipelineUseCase> {
    let config = &services.config;
    let mut settings = config.pipeline_settings();
    if sequential {
        settings = settings.with_parallel_phases(false);
    }

    let registry = build_registry(&config.providers).context("Failed to set up providers")?;
    let renderer: Arc<dyn TemplateRenderer> = match &config.templates.dir {
        Some(dir) => Arc::new(
            FileTemplateRenderer::load(dir)
                .with_context(|| format!("Failed to read templates from {}", dir.display()))?,
        ),
        None => Arc::new(FileTemplateRenderer::builtin()),
    };

    let executor = PhaseExecutor::new(Arc::new(registry), renderer, services.sink.clone())
        .with_retry(settings.retry.clone())
        .with_caching(settings.features.caching);

    let embeddings = match (&config.ranking.embedding_provider, settings.features.embeddings) {
        (Some(provider), true) => Some(
            build_embedding(&config.providers, provider)
                .context("Failed to set up embeddings")?,
        ),
        (None, true) => {
            warn!("Embeddings enabled but no ranking.embedding_provider configured");
            None
        }
        _ => None,
    };
    let ranking = RankingEngine::new(services.sink.clone()).with_embeddings(embeddings);

    let candidates: Arc<dyn CandidateRepository> = services.candidates.clone();
    Ok(RunPipelineUseCase::new(
        Arc::new(executor),
        ranking,
        services.feedback.clone(),
        settings,
        services.sink.clone(),
    )
    .with_repository(Some(candidates)))
}

async fn run_generate(
    services: &Services,
    args: GenerateArgs,
    quiet: bool,
    cancel: CancellationToken,
) -> Result<()> {
    let use_case = build_pipeline(services, args.sequential)?;

    let phases = if args.phases.is_empty() {
        services.config.phase_sequence()?
    } else {
        args.phases
    };
    let mut request = GenerationRequest::new(args.input)
        .with_phases(phases)
        .with_count(args.count.unwrap_or(use_case.settings().count))
        .with_tags(args.tags);
    if let Some(persona) = args.persona {
        request = request.with_persona(persona);
    }
    if let Some(seconds) = args.deadline {
        request = request.with_deadline(Duration::from_secs(seconds));
    }

    let input = RunPipelineInput::new(request, services.config.phase_configs()?);

    // Execute with or without progress reporting
    let result = if quiet {
        use_case
            .execute_with_progress(input, &alchemy_application::NoProgress, cancel)
            .await
    } else {
        let progress: Box<dyn ProgressNotifier> = if std::io::stderr().is_terminal() {
            Box::new(ProgressReporter::new())
        } else {
            Box::new(SimpleProgress)
        };
        use_case
            .execute_with_progress(input, progress.as_ref(), cancel)
            .await
    };

    match result {
        Ok(output) => {
            let rendered = match args.output {
                OutputFormat::Full => ConsoleFormatter::format(&output),
                OutputFormat::Text => ConsoleFormatter::format_text(&output),
                OutputFormat::Json => ConsoleFormatter::format_json(&output),
            };
            println!("{}", rendered);
            Ok(())
        }
        Err(e @ (PipelineError::Timeout { .. } | PipelineError::Cancelled { .. })) => {
            if !e.partial().is_empty() {
                eprintln!("{} - partial results:", e);
                println!("{}", ConsoleFormatter::format_ranked(e.partial(), None));
            }
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_feedback(services: &Services, candidate_id: CandidateId, signal: Signal) -> Result<()> {
    if !services
        .feedback
        .record_outcome(OutcomeSignal::new(candidate_id, signal))
    {
        bail!("Learning is disabled (features.learning = false); outcome not recorded");
    }

    let feedback_repo: &dyn FeedbackRepository = services.feedback_repo.as_ref();
    services
        .feedback
        .flush(feedback_repo)
        .await
        .context("Failed to save outcome")?;

    println!("Recorded {} for {}", signal, candidate_id);
    Ok(())
}

async fn run_retrain(services: &Services, watch: bool, cancel: CancellationToken) -> Result<()> {
    if !services.feedback.learning_enabled() {
        println!("Learning is disabled; the cold-start model stays published.\n");
        println!("{}", ConsoleFormatter::format_model(&services.feedback.current_model()));
        return Ok(());
    }

    let model = services.feedback.retrain();
    services
        .feedback_repo
        .save_model(&model)
        .await
        .context("Failed to save ranking model")?;
    println!("{}", ConsoleFormatter::format_model(&model));

    if watch {
        let interval = services.config.learning.retrain_interval();
        info!("Retraining every {}s until interrupted", interval.as_secs());
        let repository: Arc<dyn FeedbackRepository> = services.feedback_repo.clone();
        services
            .feedback
            .clone()
            .spawn_retrain_loop(interval, Some(repository), cancel)
            .await?;
        println!("{}", ConsoleFormatter::format_model(&services.feedback.current_model()));
    }
    Ok(())
}
