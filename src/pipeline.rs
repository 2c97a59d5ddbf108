//! The batch job: Loader/Backup -> Enrichment Loop -> Finalizer.
//!
//! Once [`BatchRun::init`] succeeds, the finalizer runs exactly once: after
//! the loop completes, after a shutdown signal, or when a panicked task
//! drops the batch (via `Drop`).

use crate::config::Config;
use crate::enrichment::{self, validate_us_phone, LookupStats, LookupStep};
use crate::errors::AppError;
use crate::models::{PhoneNumber, PipelineMode, ResultTable, WorkQueue};
use crate::services::{LookupService, PersonApiService, TcpaApiService};
use crate::signal::shutdown_signal;
use crate::storage;
use crate::token::{ClientTokenSource, RandomClientToken};
use chrono::Local;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Outcome of a finalized run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: PipelineMode,
    /// Numbers in the queue when the loop started.
    pub total_numbers: usize,
    /// Numbers popped and turned into a record.
    pub processed: usize,
    /// Rows in the report after dedup.
    pub written: usize,
    pub duplicates_dropped: usize,
    /// Numbers written back to the input file.
    pub remaining: usize,
    pub output_path: PathBuf,
    pub stats: Vec<LookupStats>,
}

pub struct BatchRun {
    config: Config,
    mode: PipelineMode,
    steps: Vec<LookupStep>,
    stats: Vec<LookupStats>,
    tokens: Box<dyn ClientTokenSource>,
    queue: WorkQueue,
    results: ResultTable,
    total_numbers: usize,
    processed: usize,
    in_flight: Option<PhoneNumber>,
    output_name: String,
    finalized: bool,
}

/// Builds the lookups `mode` runs, in call order.
pub fn build_steps(config: &Config, mode: PipelineMode) -> Result<Vec<LookupStep>, AppError> {
    let person_attempts = config
        .person_max_attempts
        .unwrap_or_else(|| mode.person_attempts());

    let steps = match mode {
        PipelineMode::Combined => vec![
            LookupStep::new(LookupService::Tcpa(TcpaApiService::new(config)?), 1),
            LookupStep::new(
                LookupService::Person(PersonApiService::new(config)?),
                person_attempts,
            ),
        ],
        PipelineMode::Person => vec![LookupStep::new(
            LookupService::Person(PersonApiService::new(config)?),
            person_attempts,
        )],
        PipelineMode::Tcpa => vec![LookupStep::new(
            LookupService::Tcpa(TcpaApiService::new(config)?),
            1,
        )],
    };
    Ok(steps)
}

impl BatchRun {
    /// Builds the lookup clients, then backs up the input list and loads it
    /// into the work queue.
    ///
    /// Fails before touching any file when a client cannot be built
    /// ([`AppError::ConfigError`]) or the input file is missing
    /// ([`AppError::InputNotFound`]).
    pub fn init(
        config: Config,
        mode: PipelineMode,
        tokens: Box<dyn ClientTokenSource>,
    ) -> Result<Self, AppError> {
        let started_at = Local::now();
        let output_name = storage::output_file_name(&started_at, mode);

        let steps = build_steps(&config, mode)?;

        storage::backup_file(&config.input_file, &config.backup_file)?;
        let queue = storage::load_phone_numbers(&config.input_file)?;

        let invalid = queue
            .iter()
            .filter(|phone| {
                let (valid, reason) = validate_us_phone(phone);
                if !valid {
                    warn!("Input number {} does not look like a US phone: {}", phone, reason);
                }
                !valid
            })
            .count();
        if invalid > 0 {
            warn!(
                "{} of {} numbers failed US validation; they will still be processed",
                invalid,
                queue.len()
            );
        }

        let stats = steps
            .iter()
            .map(|step| LookupStats::new(step.service.name()))
            .collect();

        info!(
            "Pipeline '{}' ready: {} numbers, output {}",
            mode,
            queue.len(),
            config.output_dir.join(&output_name).display()
        );

        Ok(Self {
            total_numbers: queue.len(),
            config,
            mode,
            steps,
            stats,
            tokens,
            queue,
            results: ResultTable::new(),
            processed: 0,
            in_flight: None,
            output_name,
            finalized: false,
        })
    }

    /// Pops and enriches `total_numbers` numbers, one at a time.
    pub async fn process(&mut self) {
        let total = self.total_numbers;

        for idx in 1..=total {
            let Some(phone) = self.queue.pop_front() else {
                break;
            };
            self.in_flight = Some(phone.clone());

            info!("Processing {}/{}: {}", idx, total, phone);
            for tally in &self.stats {
                info!(
                    "  [Stats] Successful {} API: {}, Failed {} API: {}",
                    tally.name, tally.successful, tally.name, tally.failed
                );
            }

            let record = enrichment::enrich_phone(
                &self.steps,
                &mut self.stats,
                &phone,
                self.tokens.as_ref(),
                self.config.retry_delay,
            )
            .await;
            debug!("Merged record: {}", record);

            self.results.push(record);
            self.processed += 1;
            self.in_flight = None;

            if !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }
        }
    }

    /// Dedups and writes the report, then writes the unprocessed numbers
    /// back to the input path. Both writes are attempted even if one fails.
    pub fn finalize(&mut self) -> Result<RunReport, AppError> {
        if self.finalized {
            return Err(AppError::InternalError("run already finalized".to_string()));
        }
        self.finalized = true;

        if let Some(phone) = self.in_flight.take() {
            warn!("Returning in-flight number {} to the queue", phone);
            self.queue.push_front(phone);
        }

        let duplicates_dropped = self.results.dedup();
        let written = storage::write_results(
            &self.results,
            self.mode.columns(),
            &self.config.output_dir,
            &self.output_name,
        );
        let saved = storage::save_remaining_data(&self.config.input_file, &self.queue);

        let output_path = written?;
        saved?;

        let report = RunReport {
            mode: self.mode,
            total_numbers: self.total_numbers,
            processed: self.processed,
            written: self.results.len(),
            duplicates_dropped,
            remaining: self.queue.len(),
            output_path,
            stats: self.stats.clone(),
        };
        info!(
            "Run summary: processed {}/{}, {} rows written ({} duplicates dropped), {} remaining",
            report.processed,
            report.total_numbers,
            report.written,
            report.duplicates_dropped,
            report.remaining
        );
        for tally in &report.stats {
            info!(
                "  {} API: {} successful, {} failed",
                tally.name, tally.successful, tally.failed
            );
        }
        match serde_json::to_string(&report) {
            Ok(json) => debug!("Run report: {}", json),
            Err(e) => warn!("Failed to serialize run report: {}", e),
        }
        Ok(report)
    }
}

impl Drop for BatchRun {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        error!("Pipeline stopped before finishing; writing partial results");
        if let Err(e) = self.finalize() {
            error!("Finalizer failed: {}", e);
        }
    }
}

/// Runs the whole batch with random client tokens, stopping early on
/// Ctrl-C / SIGTERM.
pub async fn run(config: Config, mode: PipelineMode) -> Result<RunReport, AppError> {
    run_with(config, mode, Box::new(RandomClientToken), shutdown_signal()).await
}

/// Runs the whole batch; `shutdown` resolving interrupts the loop.
///
/// Returns the report on clean completion. On interruption the finalizer
/// still runs and [`AppError::Interrupted`] is returned.
pub async fn run_with<F>(
    config: Config,
    mode: PipelineMode,
    tokens: Box<dyn ClientTokenSource>,
    shutdown: F,
) -> Result<RunReport, AppError>
where
    F: Future<Output = ()>,
{
    let mut batch = BatchRun::init(config, mode, tokens)?;

    let interrupted = tokio::select! {
        _ = batch.process() => false,
        _ = shutdown => true,
    };

    if interrupted {
        error!("ENDING.... processing interrupted");
    }

    let report = batch.finalize()?;
    info!("Quitting now");

    if interrupted {
        Err(AppError::Interrupted)
    } else {
        Ok(report)
    }
}
