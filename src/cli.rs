//! Command-line entry point for sync binaries.
//!
//! A sync binary registers its jobs and hands the registry to
//! [`run_main`]:
//!
//! ```no_run
//! use ts_sync::{Job, JobRegistry, Source, TargetTable};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut registry = JobRegistry::new();
//!     registry.register(Job::copy(
//!         "daily_sales",
//!         Source::table("ods.sales"),
//!         TargetTable::new("dw.daily_sales"),
//!     ))?;
//!     ts_sync::cli::run_main(registry).await
//! }
//! ```
//!
//! ```bash
//! # Everything pending in the configured window
//! daily-sync --config sync.yaml
//!
//! # Resynchronize two dates of one job
//! daily-sync --config sync.yaml --job daily_sales --date 2024-01-01 2024-01-02
//! ```

use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::info;

use crate::config::Config;
use crate::job::JobRegistry;
use crate::run::{run_sync, RunContext, RunRequest};

/// Options shared by every sync binary.
#[derive(Debug, Clone, Parser)]
pub struct SyncArgs {
    /// Configuration file (.yaml, .yml or .toml)
    #[arg(long, short, default_value = "ts-sync.yaml", env = "TS_SYNC_CONFIG")]
    pub config: PathBuf,

    /// Only run these jobs
    #[arg(long = "job", alias = "table", value_name = "NAME", num_args = 1..)]
    pub jobs: Vec<String>,

    /// Resynchronize these dates regardless of recorded completion
    #[arg(
        long = "date",
        alias = "time",
        value_name = "YYYY-MM-DD",
        num_args = 1..,
        value_parser = parse_date_arg
    )]
    pub dates: Vec<NaiveDate>,

    /// Pretend today is this date
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date_arg)]
    pub today: Option<NaiveDate>,
}

impl SyncArgs {
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// The run request these arguments describe under `config`.
    pub fn request(&self, config: &Config) -> anyhow::Result<RunRequest> {
        let window = config.window.window_for(self.today())?;
        Ok(RunRequest::new(window)
            .jobs(self.jobs.iter().cloned())
            .dates(self.dates.clone()))
    }
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, sync_core::DATE_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

/// Install the default `tracing` subscriber (`RUST_LOG`, else `info`).
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Parse arguments, run every pending job of `registry`, and exit non-zero
/// if any job failed.
pub async fn run_main(registry: JobRegistry) -> anyhow::Result<()> {
    init_logging();
    let args = SyncArgs::parse();
    let failed = run_with_args(registry, &args).await?;
    if failed > 0 {
        eprintln!("Error: {failed} job(s) failed");
        std::process::exit(1);
    }
    Ok(())
}

/// Run with already-parsed arguments; returns the number of failed jobs.
pub async fn run_with_args(registry: JobRegistry, args: &SyncArgs) -> anyhow::Result<usize> {
    let config = Config::from_file(&args.config)?;
    let ctx = RunContext::from_config(&config, args.today())
        .context("Failed to initialize the run")?;
    let request = args.request(&config)?;
    info!(
        "Sync window {} to {}",
        request.window.start, request.window.end
    );

    let report = run_sync(&ctx, &registry, &request).await?;
    Ok(report.failures.len())
}
