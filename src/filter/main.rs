//! Filter registry address files against OpenStreetMap.
//!
//! Drops addresses that are already mapped and tags suspicious ones with
//! fixme notes, writing `<name>_filtered.osm` next to every input file.

mod side_log;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use addrsync::batch::BatchFile;
use addrsync::overpass::OverpassClient;
use addrsync::reconcile::{CancelToken, Reconciler, RunReport};
use addrsync::sink::{ErrorSink, LogSink};
use addrsync::ReconcileConfig;

use crate::side_log::CsvSink;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "filter")]
#[command(about = "Remove already mapped addresses from OSM import files")]
struct Args {
    /// OSM XML files with candidate address nodes
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use a locally running Overpass instance
    #[arg(long)]
    local: bool,

    /// Run street checks for every record
    #[arg(long)]
    deep: bool,

    /// CSV file for invalid names and malformed records
    #[arg(long)]
    invalid_log: Option<PathBuf>,

    /// Write the run report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => ReconcileConfig::load_from_file(path)?,
        None => ReconcileConfig::default(),
    };
    if args.local {
        config.use_local_overpass();
    }
    if args.deep {
        config.deep_checks = true;
    }
    config.validate().context("Invalid configuration")?;

    info!("addrsync filter, {} files", args.files.len());

    let files = args
        .files
        .iter()
        .map(|path| {
            BatchFile::read(path).with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current record");
            on_interrupt.cancel();
        }
    });

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message("Reconciling against OpenStreetMap...");
    pb.enable_steady_tick(Duration::from_millis(120));

    let invalid_log = args.invalid_log.clone();
    let report = tokio::task::spawn_blocking(move || run(files, config, cancel, invalid_log))
        .await
        .context("Reconciliation task failed")??;

    pb.finish_and_clear();

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }

    print_summary(&report);
    Ok(())
}

/// Reconcile and write outputs. Runs on a blocking thread since the
/// Overpass client is synchronous.
fn run(
    mut files: Vec<BatchFile>,
    config: ReconcileConfig,
    cancel: CancelToken,
    invalid_log: Option<PathBuf>,
) -> Result<RunReport> {
    let client = OverpassClient::new(&config.overpass_url, config.timeout_secs)?;
    let fixme_prefix = config.fixme_prefix.clone();
    let reconciler = Reconciler::with_cancel_token(client, config, cancel);

    let mut csv_sink = invalid_log.as_deref().map(CsvSink::create).transpose()?;
    let mut log_sink = LogSink;
    let sink: &mut dyn ErrorSink = match csv_sink.as_mut() {
        Some(csv) => csv,
        None => &mut log_sink,
    };

    let report = reconciler.reconcile_batch(&mut files, sink)?;

    for file in &files {
        file.write_filtered(&fixme_prefix)
            .with_context(|| format!("Failed to write output for {}", file.name()))?;
    }
    if let Some(csv) = csv_sink {
        csv.finish()?;
    }
    Ok(report)
}

fn print_summary(report: &RunReport) {
    for file in &report.files {
        info!(
            "{}: {} records, {} suppressed, {} flagged, {} skipped, {} unprocessed",
            file.name, file.total, file.suppressed, file.flagged, file.skipped, file.unprocessed
        );
    }

    let totals = report.totals();
    info!("=== Summary ===");
    info!(
        "Started {}, finished {} ({} s)",
        report.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        report.finished_at.with_timezone(&Local).format("%H:%M:%S"),
        report.duration().num_seconds()
    );
    info!(
        "{} records: {} remaining, {} suppressed, {} flagged",
        totals.total,
        totals.remaining(),
        totals.suppressed,
        totals.flagged
    );
    if totals.skipped > 0 || report.invalid_names > 0 {
        warn!(
            "{} malformed records, {} invalid names",
            totals.skipped, report.invalid_names
        );
    }
    info!("{} Overpass queries", report.queries);
    if report.cancelled {
        warn!(
            "Run was cancelled, {} records left unprocessed",
            totals.unprocessed
        );
    }
}
