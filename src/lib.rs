//! ts-sync Library
//!
//! Incremental, idempotent synchronization of date-partitioned tables
//! between relational databases.
//!
//! # Features
//!
//! - Per-job, per-date completion tracking: reruns only touch dates that
//!   are missing or explicitly forced
//! - Source readers for single tables, raw queries and join chains
//! - Target writers that overwrite by date, upsert on a unique key, or
//!   shard by calendar year
//! - Null filtering that withholds partially written dates from completion
//! - Failure isolation: a failing job never stops the others
//!
//! # Workspace Crates
//!
//! - `sync_core` - values, row sets, dates and the `Connection` trait
//! - `sync_state` - completion records, the sync window and the state matrix
//! - `ts_sync_mysql` - MySQL connection and completion store
//!
//! # Running a Sync
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use chrono::NaiveDate;
//! use sync_core::{RowSet, Value};
//! use sync_state::{MemoryStore, SyncWindow};
//! use ts_sync::testing::MemoryConnection;
//! use ts_sync::{run_sync, ConnectionRegistry, Job, JobRegistry, Role, RunContext, RunRequest};
//! use ts_sync::{Source, TargetTable};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let ods = Arc::new(MemoryConnection::new("ods"));
//! ods.respond("FROM sales", RowSet::new(["date", "v"]).with_row([Value::Date(day), Value::Int(1)])?)
//!     .await;
//!
//! let mut connections = ConnectionRegistry::new();
//! connections.register_in_role(Role::Source, "ods", true, ods);
//! connections.register_in_role(Role::Target, "dw", true, Arc::new(MemoryConnection::new("dw")));
//!
//! let mut jobs = JobRegistry::new();
//! jobs.register(Job::copy("sales", Source::table("sales"), TargetTable::new("sales")))?;
//!
//! let ctx = RunContext::new(connections, Arc::new(MemoryStore::new()), day);
//! let request = RunRequest::new(SyncWindow::new(day, day)?);
//! let report = run_sync(&ctx, &jobs, &request).await?;
//! assert!(report.success());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod connect;
pub mod executor;
pub mod job;
pub mod run;
pub mod source;
pub mod target;
pub mod testing;

pub use config::Config;
pub use connect::{ConnectionRegistry, Role, SOURCES_DEFAULT, TARGETS_DEFAULT};
pub use executor::{JobExecutor, JobOutcome, JobState};
pub use job::{Job, JobRegistry, SourceData, Transform, TransformResult};
pub use run::{plan_run, run_sync, RunContext, RunReport, RunRequest};
pub use source::{JoinKind, JoinRelation, Source, SourceKind};
pub use target::{NullAxis, NullPolicy, TargetTable, WriteMode, WriteOutcome};
