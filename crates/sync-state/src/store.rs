//! Completion-state storage trait and record type
//!
//! This module defines the CompletionStore trait for backend-agnostic
//! completion tracking, plus the record it persists.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Marker that `job_name` fully synchronized `date`.
///
/// At most one record exists per (date, job_name) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// Synchronized calendar date
    pub date: NaiveDate,
    /// Job that produced the data for that date
    pub job_name: String,
}

impl CompletionRecord {
    pub fn new(date: NaiveDate, job_name: impl Into<String>) -> Self {
        Self {
            date,
            job_name: job_name.into(),
        }
    }
}

/// Trait for completion-state storage operations.
///
/// This trait abstracts the storage backend, allowing the same planning
/// and commit logic to work with:
/// - MySQL (`MySqlCompletionStore` in the ts-sync-mysql crate)
/// - A local JSON file (`FileStore`)
/// - Process memory (`MemoryStore`)
#[async_trait]
pub trait CompletionStore: Send + Sync {
    /// Create the backing table (or file) if it does not exist yet.
    async fn ensure_schema(&self) -> Result<()>;

    /// All records with `start <= date <= end`.
    async fn load_since(&self, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<CompletionRecord>>;

    /// Mark `dates` as synchronized for `job_name`.
    ///
    /// Existing records for (`job_name`, any of `dates`) are deleted and
    /// fresh ones inserted, atomically. An empty `dates` is a no-op.
    async fn commit(&self, job_name: &str, dates: &[NaiveDate]) -> Result<()>;

    /// The externally maintained list of jobs eligible for synchronization.
    ///
    /// Returns `None` when this backend has no job catalog configured.
    async fn registered_jobs(&self) -> Result<Option<Vec<String>>>;
}
