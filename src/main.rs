//! Administrative command-line interface for ts-sync
//!
//! Sync binaries themselves are built by registering jobs and calling
//! `ts_sync::cli::run_main`; this binary only inspects and prepares the
//! completion state.
//!
//! # Usage Examples
//!
//! ```bash
//! # Create the completion-state table
//! ts-sync init --config sync.yaml
//!
//! # Pending dates of every catalogued job
//! ts-sync status --config sync.yaml
//!
//! # Pending dates of one job, as JSON
//! ts-sync status --config sync.yaml --job daily_sales --format json
//! ```

use std::collections::BTreeMap;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sync_core::format_date;
use ts_sync::cli::{init_logging, SyncArgs};
use ts_sync::{plan_run, Config, JobRegistry, RunContext};

#[derive(Parser)]
#[command(name = "ts-sync")]
#[command(about = "Inspect and prepare ts-sync completion state")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the completion-state storage if it does not exist
    Init {
        #[command(flatten)]
        args: SyncArgs,
    },

    /// Show the pending dates of each job in the configured window
    Status {
        #[command(flatten)]
        args: SyncArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { args } => {
            let config = Config::from_file(&args.config)?;
            let ctx = RunContext::from_config(&config, args.today())?;
            ctx.store
                .ensure_schema()
                .await
                .context("Failed to create completion-state storage")?;
            println!("Completion-state storage is ready");
        }
        Commands::Status { args, format } => {
            let config = Config::from_file(&args.config)?;
            let ctx = RunContext::from_config(&config, args.today())?;
            let request = args.request(&config)?;

            // No transforms are registered here; jobs come from the catalog
            // or from --job.
            let plan = plan_run(&ctx, &JobRegistry::new(), &request).await?;
            let pending: BTreeMap<&str, Vec<String>> = plan
                .jobs
                .iter()
                .map(|job| {
                    let dates = plan.matrix.pending_dates(job);
                    (job.as_str(), dates.into_iter().map(format_date).collect())
                })
                .collect();

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pending)?),
                OutputFormat::Text => {
                    println!(
                        "Window {} to {}",
                        format_date(request.window.start),
                        format_date(request.window.end)
                    );
                    for (job, dates) in &pending {
                        if dates.is_empty() {
                            println!("{job}: synchronized");
                        } else {
                            println!("{job}: {} pending ({})", dates.len(), dates.join(", "));
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
