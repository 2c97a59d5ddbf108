use clap::Parser;
use rust_phone_enrich::cli::Cli;
use rust_phone_enrich::config::Config;
use rust_phone_enrich::errors::AppError;
use rust_phone_enrich::pipeline;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the batch job.
///
/// Initializes logging, loads configuration, then runs the pipeline on a
/// single-threaded runtime. Exit status is 0 on clean completion and 1 on
/// any failure; once the input has been loaded, results and the resume file
/// are written before exiting either way.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => cli.apply(config),
        Err(e) => {
            tracing::error!("Invalid configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Configuration loaded successfully (mode: {})", cli.mode);

    // Spawned so a panic in the loop surfaces as a JoinError. The runtime
    // drops the panicked task, and dropping the batch runs the finalizer.
    let handle = tokio::spawn(pipeline::run(config, cli.mode));

    match handle.await {
        Ok(Ok(report)) => {
            tracing::info!(
                "✓ Done: {} rows in {}",
                report.written,
                report.output_path.display()
            );
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            match e.root() {
                AppError::InputNotFound(path) => {
                    tracing::error!("Error: Input file '{}' not found.", path);
                }
                _ => tracing::error!("Exception occurred: {}", e),
            }
            ExitCode::FAILURE
        }
        Err(join_error) => {
            tracing::error!("Pipeline aborted: {}", join_error);
            ExitCode::FAILURE
        }
    }
}
