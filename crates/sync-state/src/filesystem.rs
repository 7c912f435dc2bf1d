//! Filesystem-based completion storage implementation.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::store::{CompletionRecord, CompletionStore};

/// On-disk layout of a [`FileStore`].
///
/// ```json
/// {
///     "records": [
///         { "date": "2024-01-01", "job_name": "daily_sales" }
///     ]
/// }
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    records: BTreeSet<CompletionRecord>,
}

/// Filesystem implementation of the CompletionStore trait.
///
/// Keeps all records in one JSON file. Commits rewrite the file through a
/// temporary sibling and a rename, so a crash leaves either the old or
/// the new state on disk.
pub struct FileStore {
    path: PathBuf,
    catalog: Option<Vec<String>>,
    lock: Mutex<()>,
}

impl FileStore {
    /// Create a new FileStore backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            catalog: None,
            lock: Mutex::new(()),
        }
    }

    /// Use `jobs` as the job catalog.
    pub fn with_catalog(mut self, jobs: Vec<String>) -> Self {
        self.catalog = Some(jobs);
        self
    }

    /// Get the file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read(&self) -> Result<StateFile> {
        if !self.path.exists() {
            return Ok(StateFile::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file {}", self.path.display()))?;
        let state = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file {}", self.path.display()))?;
        Ok(state)
    }

    fn write(&self, state: &StateFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(state)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl CompletionStore for FileStore {
    async fn ensure_schema(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        if !self.path.exists() {
            self.write(&StateFile::default())?;
            tracing::info!("Created completion state file {}", self.path.display());
        }
        Ok(())
    }

    async fn load_since(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CompletionRecord>> {
        let _guard = self.lock.lock().await;
        let state = self.read()?;
        Ok(state
            .records
            .into_iter()
            .filter(|r| r.date >= start && r.date <= end)
            .collect())
    }

    async fn commit(&self, job_name: &str, dates: &[NaiveDate]) -> Result<()> {
        if dates.is_empty() {
            return Ok(());
        }
        let _guard = self.lock.lock().await;
        let mut state = self.read()?;
        state
            .records
            .retain(|r| !(r.job_name == job_name && dates.contains(&r.date)));
        state
            .records
            .extend(dates.iter().map(|d| CompletionRecord::new(*d, job_name)));
        self.write(&state)?;
        tracing::debug!(
            "Stored {} completion records for {} in {}",
            dates.len(),
            job_name,
            self.path.display()
        );
        Ok(())
    }

    async fn registered_jobs(&self) -> Result<Option<Vec<String>>> {
        Ok(self.catalog.clone())
    }
}
