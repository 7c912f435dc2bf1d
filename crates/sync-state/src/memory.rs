//! In-process completion storage.

use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::store::{CompletionRecord, CompletionStore};

/// CompletionStore that keeps records in memory.
///
/// Used by tests and dry runs; nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeSet<CompletionRecord>>,
    catalog: Option<Vec<String>>,
    commits: Mutex<Vec<(String, Vec<NaiveDate>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose job catalog lists `jobs`.
    pub fn with_catalog<I, S>(jobs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            catalog: Some(jobs.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Seed existing records.
    pub async fn insert(&self, records: impl IntoIterator<Item = CompletionRecord>) {
        self.records.lock().await.extend(records);
    }

    /// Every stored record, ordered by date then job.
    pub async fn records(&self) -> Vec<CompletionRecord> {
        self.records.lock().await.iter().cloned().collect()
    }

    /// Every commit call received, in order.
    pub async fn commits(&self) -> Vec<(String, Vec<NaiveDate>)> {
        self.commits.lock().await.clone()
    }
}

#[async_trait]
impl CompletionStore for MemoryStore {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn load_since(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CompletionRecord>> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| r.date >= start && r.date <= end)
            .cloned()
            .collect())
    }

    async fn commit(&self, job_name: &str, dates: &[NaiveDate]) -> Result<()> {
        if dates.is_empty() {
            return Ok(());
        }
        let mut records = self.records.lock().await;
        records.retain(|r| !(r.job_name == job_name && dates.contains(&r.date)));
        records.extend(dates.iter().map(|d| CompletionRecord::new(*d, job_name)));
        self.commits
            .lock()
            .await
            .push((job_name.to_string(), dates.to_vec()));
        Ok(())
    }

    async fn registered_jobs(&self) -> Result<Option<Vec<String>>> {
        Ok(self.catalog.clone())
    }
}
