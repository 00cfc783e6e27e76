//! CLI entrypoint for atlance
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Result, anyhow};
use atlance_application::{
    AnswerPort, DeclineAnswers, NoProgress, NoRunLogger, PipelineParams,
    PipelineProgressNotifier, RunLogger, StageInput,
};
use atlance_domain::Model;
use atlance_infrastructure::{
    BatchLoader, ConfigLoader, DuckDuckGoSearch, FileConfig, JsonlRunLogger, OllamaClient,
    OllamaGateway,
};
use atlance_presentation::{
    Cli, ConsoleAnswerer, ConsoleFormatter, OutputFormat, ProgressReporter, SimpleProgress,
};
use clap::Parser;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Install the stderr subscriber, plus a daily log file when `log_dir` is set.
///
/// The returned guard flushes the file writer when dropped.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "atlance.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new(level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(EnvFilter::new(level)),
        )
        .with(file_layer)
        .init();

    guard
}

/// Apply command-line overrides on top of the file configuration.
fn apply_overrides(mut params: PipelineParams, cli: &Cli) -> PipelineParams {
    if let Some(mode) = cli.mode {
        params = params.with_mode(mode);
    }
    if let Some(model) = &cli.model {
        let Ok(model) = model.parse::<Model>();
        params = params.with_default_model(model);
    }
    if let Some(max) = cli.max_selected {
        params = params.with_max_selected(max);
    }
    if cli.no_landmarks {
        params = params.with_landmarks(false);
    }
    if cli.no_questions {
        params = params.with_questions(false);
    }
    params
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    if cli.no_config {
        return Ok(ConfigLoader::load_defaults());
    }
    ConfigLoader::load(cli.config.as_ref())
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli)?;

    let log_dir = cli.log_dir.as_ref().or(config.logging.log_dir.as_ref());
    let _log_guard = init_tracing(cli.verbose, log_dir.map(|p| p.as_path()));

    info!("Starting atlance");

    let params = apply_overrides(config.to_params()?, &cli);

    // === Input ===
    let mut loader = BatchLoader::new();
    if let Some(path) = &cli.metadata {
        loader = loader.with_metadata_file(path)?;
    }
    let batch = loader.load(&cli.paths)?;
    info!("Loaded {} photos", batch.len());

    // === Dependency Injection ===
    let client = OllamaClient::new(
        &config.provider.base_url,
        config.provider.request_timeout_seconds,
    )?
    .with_keep_alive(config.provider.keep_alive.clone());
    let gateway = Arc::new(OllamaGateway::with_client(client));

    let search = DuckDuckGoSearch::new(Duration::from_secs(
        config.capabilities.search_timeout_seconds,
    ))?;

    let answers: Arc<dyn AnswerPort> = if cli.non_interactive {
        Arc::new(DeclineAnswers)
    } else {
        Arc::new(ConsoleAnswerer::new())
    };

    let progress: Arc<dyn PipelineProgressNotifier> = if cli.quiet {
        Arc::new(NoProgress)
    } else if std::io::stderr().is_terminal() {
        Arc::new(ProgressReporter::new())
    } else {
        Arc::new(SimpleProgress)
    };

    let run_log_dir = cli.run_log_dir.as_ref().or(config.logging.run_log_dir.as_ref());
    let logger: Arc<dyn RunLogger> = match run_log_dir.and_then(JsonlRunLogger::in_dir) {
        Some(logger) => {
            info!("Run transcript: {}", logger.path().display());
            Arc::new(logger)
        }
        None => Arc::new(NoRunLogger),
    };

    let coordinator = params
        .coordinator(gateway)
        .with_search(params.search_capability(Arc::new(search)))
        .with_answers(answers)
        .with_progress(progress)
        .with_run_logger(logger);

    // Ctrl+C cancels the run cooperatively
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling run");
                cancel.cancel();
            }
        });
    }

    let run = coordinator.new_run(params.graph(), StageInput::new(batch));
    match coordinator.execute(run, cancel).await {
        Ok(report) => {
            let output = match cli.output {
                OutputFormat::Full => ConsoleFormatter::format(&report),
                OutputFormat::Story => ConsoleFormatter::format_story_only(&report),
                OutputFormat::Json => ConsoleFormatter::format_json(&report),
            };
            println!("{}", output);
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            eprintln!("{}", ConsoleFormatter::format_failure(&failure));
            let code = if failure.is_cancelled() { 130 } else { 1 };
            Ok(ExitCode::from(code))
        }
    }
}
