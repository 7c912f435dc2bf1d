//! Per-job execution.
//!
//! ```text
//! Pending -> FetchingSources -> Transforming -> WritingTargets -> Reconciling -> Committed
//!                  |
//!                  +-> ShortCircuitEmpty
//! ```
//!
//! Any error moves the job to `Failed`; the caller decides what that
//! means for the rest of the run.

use std::collections::BTreeSet;

use anyhow::Context;
use chrono::NaiveDate;
use sync_core::SyncError;
use sync_state::{CompletionStore, StateMatrix};
use tracing::{debug, info};

use crate::connect::{ConnectionRegistry, Role};
use crate::job::{Job, SourceData};
use crate::target::WriteOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    FetchingSources,
    ShortCircuitEmpty,
    Transforming,
    WritingTargets,
    Reconciling,
    Committed,
    Failed,
}

/// How a job that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// No pending dates
    AlreadySynchronized,
    /// An empty-checked source returned no rows; nothing written
    EmptySource,
    /// These dates were recorded as synchronized
    Committed(Vec<NaiveDate>),
    /// Targets were written but no date could be recorded
    NothingCommitted(String),
}

/// Drives one job through its states.
pub struct JobExecutor<'a> {
    job: &'a Job,
    connections: &'a ConnectionRegistry,
    store: &'a dyn CompletionStore,
    state: JobState,
}

impl<'a> JobExecutor<'a> {
    pub fn new(
        job: &'a Job,
        connections: &'a ConnectionRegistry,
        store: &'a dyn CompletionStore,
    ) -> Self {
        Self {
            job,
            connections,
            store,
            state: JobState::Pending,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn transition(&mut self, next: JobState) {
        debug!("{}: {:?} -> {:?}", self.job.name(), self.state, next);
        self.state = next;
    }

    /// Synchronize the dates `matrix` marks pending for this job.
    pub async fn execute(&mut self, matrix: &StateMatrix) -> anyhow::Result<JobOutcome> {
        let result = self.run(matrix).await;
        if result.is_err() {
            self.transition(JobState::Failed);
        }
        result
    }

    async fn run(&mut self, matrix: &StateMatrix) -> anyhow::Result<JobOutcome> {
        let job = self.job;
        let name = job.name();
        let pending = matrix.pending_dates(name);
        if pending.is_empty() {
            info!("{} is already synchronized", name);
            return Ok(JobOutcome::AlreadySynchronized);
        }
        debug!("{}: {} pending date(s)", name, pending.len());

        self.transition(JobState::FetchingSources);
        let mut fetched = Vec::with_capacity(job.sources().len());
        for source in job.sources() {
            let db = self.connections.resolve(source.db.as_deref(), Role::Source)?;
            let rows = source
                .fetch(db.as_ref(), &pending)
                .await
                .with_context(|| format!("Failed to fetch {}", source.describe()))?;
            if source.empty_check && rows.is_empty() {
                self.transition(JobState::ShortCircuitEmpty);
                info!(
                    "{}: {} has no data for the pending dates, skipping this run",
                    name,
                    source.describe()
                );
                return Ok(JobOutcome::EmptySource);
            }
            fetched.push(rows);
        }

        self.transition(JobState::Transforming);
        let input = SourceData {
            job: name.to_string(),
            pending_dates: pending,
            sources: fetched,
        };
        let results = job
            .transform()
            .transform(&input)
            .with_context(|| format!("Transform of {name} failed"))?;
        if results.len() != job.targets().len() {
            return Err(SyncError::Shape(format!(
                "transform of {name} returned {} result(s) for {} target(s)",
                results.len(),
                job.targets().len()
            ))
            .into());
        }

        self.transition(JobState::WritingTargets);
        let mut suppressed = false;
        let mut completed: Vec<BTreeSet<NaiveDate>> = Vec::new();
        for (target, result) in job.targets().iter().zip(results) {
            let Some(rows) = result else {
                info!("{}: no result for {}, commit suppressed", name, target.table);
                suppressed = true;
                continue;
            };
            let db = self.connections.resolve(target.db.as_deref(), Role::Target)?;
            let outcome = target
                .write(db.as_ref(), rows)
                .await
                .with_context(|| format!("Failed to write {}", target.table))?;
            if let WriteOutcome::Completed(dates) = outcome {
                completed.push(dates);
            }
        }

        self.transition(JobState::Reconciling);
        if suppressed {
            return Ok(JobOutcome::NothingCommitted(
                "a target received no result".to_string(),
            ));
        }
        let Some(dates) = intersect(completed) else {
            return Ok(JobOutcome::NothingCommitted(
                "no target tracks completion".to_string(),
            ));
        };
        if dates.is_empty() {
            info!("{}: no date completed in every target", name);
            return Ok(JobOutcome::NothingCommitted(
                "no date completed in every target".to_string(),
            ));
        }

        self.store
            .commit(name, &dates)
            .await
            .with_context(|| format!("Failed to record completion for {name}"))?;
        self.transition(JobState::Committed);
        info!("{}: recorded {} synchronized date(s)", name, dates.len());
        Ok(JobOutcome::Committed(dates))
    }
}

/// Dates present in every set; `None` when there are no sets.
fn intersect(sets: Vec<BTreeSet<NaiveDate>>) -> Option<Vec<NaiveDate>> {
    let mut sets = sets.into_iter();
    let first = sets.next()?;
    let common = sets.fold(first, |acc, set| acc.intersection(&set).copied().collect());
    Some(common.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn set(list: &[&str]) -> BTreeSet<NaiveDate> {
        list.iter().map(|s| d(s)).collect()
    }

    #[test]
    fn test_intersect() {
        assert_eq!(intersect(vec![]), None);
        assert_eq!(
            intersect(vec![set(&["2024-01-01", "2024-01-02"])]),
            Some(vec![d("2024-01-01"), d("2024-01-02")])
        );
        assert_eq!(
            intersect(vec![
                set(&["2024-01-01", "2024-01-02", "2024-01-03"]),
                set(&["2024-01-02", "2024-01-03", "2024-01-04"]),
            ]),
            Some(vec![d("2024-01-02"), d("2024-01-03")])
        );
        assert_eq!(
            intersect(vec![set(&["2024-01-01"]), set(&[])]),
            Some(vec![])
        );
    }
}
