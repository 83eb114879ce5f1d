//! # finwire
//!
//! Scheduled ingestion of financial news into one normalized article feed.
//!
//! ## Usage
//!
//! ```sh
//! finwire --once -j ./json          # one run, then exit
//! finwire -j ./json -c finwire.yaml  # run on a cadence until Ctrl-C
//! ```
//!
//! `--once` exits non-zero only when every source failed and nothing was
//! produced.

use clap::Parser;
use finwire::cli::Cli;
use finwire::config::IngestConfig;
use finwire::fetch::HttpFetcher;
use finwire::models::BatchResult;
use finwire::orchestrator::Orchestrator;
use finwire::outputs::json::JsonStore;
use finwire::registry::SourceRegistry;
use finwire::scheduler::{Cadence, Scheduler, TriggerOutcome};
use finwire::utils::truncate_for_log;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("finwire starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // --- Configuration ---
    let base = match &args.config {
        Some(path) => IngestConfig::load(path)?,
        None => IngestConfig::default(),
    };
    let cfg = args.apply(base);
    cfg.validate()?;
    info!(
        interval_seconds = cfg.interval_seconds,
        sources = ?cfg.active_source_ids,
        "Configuration loaded"
    );

    let registry = SourceRegistry::with_builtin()?;
    registry.ensure_known(&cfg.active_source_ids)?;
    let registry = registry.freeze();

    let fetcher = Arc::new(HttpFetcher::new(&cfg.user_agent, cfg.limits().page_timeout)?);
    let orchestrator = Arc::new(Orchestrator::new(registry, fetcher, cfg.limits()));

    // Early check: the output directory must be writable before any fetching.
    let store = match JsonStore::open(&args.json_output_dir).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!(
                path = %args.json_output_dir.display(),
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e.into());
        }
    };

    let cadence = Cadence::new(cfg.interval_seconds, cfg.active_source_ids.clone())?;
    let scheduler = Scheduler::new(Arc::clone(&orchestrator), store, cadence);

    if args.once {
        let TriggerOutcome::Ran(batch) = scheduler.trigger_now().await else {
            return Err("run did not start".into());
        };
        log_summary(&batch);
        let elapsed = start_time.elapsed();
        info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
        if batch.is_total_failure() {
            return Err("every source failed and no articles were produced".into());
        }
        return Ok(());
    }

    let handle = scheduler.start(cfg.interval_seconds, cfg.active_source_ids.clone())?;
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received; shutting down");
    scheduler.stop();
    orchestrator.cancel();
    if let Err(e) = handle.await {
        warn!(error = %e, "Scheduler task ended abnormally");
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, runs = scheduler.completed_runs(), "Execution complete");
    Ok(())
}

fn log_summary(batch: &BatchResult) {
    for (source, outcome) in &batch.outcomes {
        if outcome.failed > 0 {
            warn!(
                %source,
                succeeded = outcome.succeeded,
                failed = outcome.failed,
                last_error = %truncate_for_log(outcome.last_error.as_deref().unwrap_or(""), 300),
                "Source had failures"
            );
        } else {
            info!(%source, succeeded = outcome.succeeded, skipped = outcome.skipped, "Source ok");
        }
        for w in &outcome.warnings {
            warn!(%source, warning = %w, "Classifier warning");
        }
    }
    info!(
        articles = batch.articles.len(),
        failed = batch.failed_count(),
        "Batch summary"
    );
}
