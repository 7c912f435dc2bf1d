//! Run orchestration.
//!
//! A run plans once (state matrix + job list), prepares sharded targets,
//! then executes jobs one after another. A failing job never stops the
//! jobs after it; failures are collected into the [`RunReport`].

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use sync_core::SyncError;
use sync_state::{
    build_state_matrix, CompletionStore, FileStore, MatrixRequest, RunPlan, SyncWindow,
};
use tracing::{error, info, warn};
use ts_sync_mysql::{new_mysql_pool, MySqlCompletionStore, StateTables};

use crate::config::{Config, StateBackend};
use crate::connect::{ConnectionRegistry, Role, TARGETS_DEFAULT};
use crate::executor::{JobExecutor, JobOutcome};
use crate::job::JobRegistry;
use crate::target::shard;

/// Column of the job catalog table holding job names.
pub const CATALOG_COLUMN: &str = "table_name";

/// Everything a run shares across jobs. Owned by the caller.
pub struct RunContext {
    pub connections: ConnectionRegistry,
    pub store: Arc<dyn CompletionStore>,
    /// Date the run considers "today"; drives shard pre-creation
    pub today: NaiveDate,
    pub shard_precreate_days: u32,
}

impl RunContext {
    pub fn new(
        connections: ConnectionRegistry,
        store: Arc<dyn CompletionStore>,
        today: NaiveDate,
    ) -> Self {
        Self {
            connections,
            store,
            today,
            shard_precreate_days: 7,
        }
    }

    /// Open connections and the completion store described by `config`.
    pub fn from_config(config: &Config, today: NaiveDate) -> anyhow::Result<Self> {
        let connections = ConnectionRegistry::from_config(&config.connections, config.batch_size)?;
        let store = open_store(config)?;
        Ok(Self {
            connections,
            store,
            today,
            shard_precreate_days: config.shard.precreate_days,
        })
    }
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn CompletionStore>> {
    let state = &config.state;
    match state.backend {
        StateBackend::File => {
            let path = state.path.clone().ok_or_else(|| {
                SyncError::Config("state.path is required for the file backend".to_string())
            })?;
            let store = match &state.jobs {
                Some(jobs) => FileStore::new(path).with_catalog(jobs.clone()),
                None => FileStore::new(path),
            };
            Ok(Arc::new(store))
        }
        StateBackend::Mysql => {
            let targets = &config.connections.targets;
            let entry = match &state.connection {
                Some(alias) => targets.iter().find(|c| &c.alias == alias),
                None => targets.iter().find(|c| c.default),
            }
            .ok_or_else(|| {
                SyncError::Config(format!(
                    "no target connection '{}' for the completion state",
                    state.connection.as_deref().unwrap_or(TARGETS_DEFAULT)
                ))
            })?;
            let pool = new_mysql_pool(&entry.url)?;
            Ok(Arc::new(MySqlCompletionStore::new(
                pool,
                StateTables {
                    table: state.table.clone(),
                    catalog_table: state.catalog_table.clone(),
                    catalog_column: CATALOG_COLUMN.to_string(),
                },
            )))
        }
    }
}

/// What the caller asked this run to do.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Jobs to run; empty runs every known job
    pub jobs: Vec<String>,
    /// Dates to resynchronize regardless of history; empty uses the window
    pub dates: Vec<NaiveDate>,
    pub window: SyncWindow,
}

impl RunRequest {
    pub fn new(window: SyncWindow) -> Self {
        Self {
            jobs: Vec::new(),
            dates: Vec::new(),
            window,
        }
    }

    pub fn jobs<I, S>(mut self, jobs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.jobs = jobs.into_iter().map(Into::into).collect();
        self
    }

    pub fn dates(mut self, dates: Vec<NaiveDate>) -> Self {
        self.dates = dates;
        self
    }
}

/// Per-job results of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<(String, JobOutcome)>,
    /// (job, full error chain)
    pub failures: Vec<(String, String)>,
}

impl RunReport {
    /// The process-wide flag: false if any job failed.
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn outcome(&self, job: &str) -> Option<&JobOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == job)
            .map(|(_, outcome)| outcome)
    }

    pub fn failed(&self, job: &str) -> bool {
        self.failures.iter().any(|(name, _)| name == job)
    }

    fn fail(&mut self, job: &str, message: String) {
        error!("{} failed: {}", job, message);
        self.failures.push((job.to_string(), message));
    }
}

/// Build the state matrix and job list for `request`.
pub async fn plan_run(
    ctx: &RunContext,
    registry: &JobRegistry,
    request: &RunRequest,
) -> anyhow::Result<RunPlan> {
    let history = ctx
        .store
        .load_since(request.window.start, request.window.end)
        .await
        .context("Failed to load completion state")?;
    let known = ctx
        .store
        .registered_jobs()
        .await
        .context("Failed to load the job catalog")?
        .unwrap_or_else(|| registry.names());

    Ok(build_state_matrix(MatrixRequest {
        requested_jobs: &request.jobs,
        requested_dates: &request.dates,
        window: request.window,
        known_jobs: &known,
        history: &history,
    }))
}

/// Create next year's shards for the sharded targets of `jobs`.
///
/// Each (connection, table) is prepared once. Returns every job owning a
/// target whose preparation failed.
async fn prepare_shards(
    ctx: &RunContext,
    registry: &JobRegistry,
    jobs: &[String],
) -> HashMap<String, String> {
    let planned: Vec<_> = jobs.iter().filter_map(|name| registry.get(name)).collect();

    let mut results: HashMap<(Option<String>, String), Option<String>> = HashMap::new();
    for target in planned.iter().flat_map(|job| job.targets()).filter(|t| t.sharded) {
        let key = (target.db.clone(), target.table.clone());
        if results.contains_key(&key) {
            continue;
        }
        let prepared = match ctx.connections.resolve(target.db.as_deref(), Role::Target) {
            Ok(db) => {
                shard::ensure_next_shard(
                    db.as_ref(),
                    &target.table,
                    ctx.today,
                    ctx.shard_precreate_days,
                )
                .await
            }
            Err(e) => Err(e),
        };
        let error = prepared.err().map(|e| {
            warn!("Failed to prepare shards of {}: {}", target.table, e);
            format!("shard preparation of {}: {e}", target.table)
        });
        results.insert(key, error);
    }

    let mut failed = HashMap::new();
    for job in planned {
        let error = job
            .targets()
            .iter()
            .filter(|t| t.sharded)
            .find_map(|t| results.get(&(t.db.clone(), t.table.clone())).cloned().flatten());
        if let Some(message) = error {
            failed.insert(job.name().to_string(), message);
        }
    }
    failed
}

/// Synchronize every planned job.
///
/// Returns `Err` only for problems that stop the run before any job
/// starts (configuration, completion-state access). Job failures are
/// reported in the [`RunReport`].
pub async fn run_sync(
    ctx: &RunContext,
    registry: &JobRegistry,
    request: &RunRequest,
) -> anyhow::Result<RunReport> {
    registry.validate(&ctx.connections)?;
    ctx.store
        .ensure_schema()
        .await
        .context("Failed to prepare completion state storage")?;

    let plan = plan_run(ctx, registry, request).await?;
    info!(
        "Synchronizing {} job(s) over {} date(s)",
        plan.jobs.len(),
        plan.matrix.dates().len()
    );

    let shard_failures = prepare_shards(ctx, registry, &plan.jobs).await;

    let mut report = RunReport::default();
    for name in &plan.jobs {
        let Some(job) = registry.get(name) else {
            report.fail(name, "no job registered under this name".to_string());
            continue;
        };
        if let Some(message) = shard_failures.get(name) {
            report.fail(name, message.clone());
            continue;
        }

        let mut executor = JobExecutor::new(job, &ctx.connections, ctx.store.as_ref());
        match executor.execute(&plan.matrix).await {
            Ok(outcome) => report.outcomes.push((name.clone(), outcome)),
            Err(e) => report.fail(name, format!("{e:#}")),
        }
    }

    if report.success() {
        info!("Run finished: {} job(s) processed", report.outcomes.len());
    } else {
        error!(
            "Run finished with {} failed job(s) out of {}",
            report.failures.len(),
            plan.jobs.len()
        );
    }
    Ok(report)
}
