//! Date × job completion matrix.
//!
//! The matrix is rebuilt at the start of every run from the persisted
//! completion records. A cell is `true` when the job is known to have
//! synchronized that date; anything not on record is pending.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use crate::store::CompletionRecord;
use crate::window::SyncWindow;

/// Per-run, read-only view of which job has synchronized which date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateMatrix {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<bool>>,
}

impl StateMatrix {
    /// All-pending matrix over `dates` × `jobs`.
    fn pending(dates: Vec<NaiveDate>, jobs: &[String]) -> Self {
        let columns = jobs
            .iter()
            .map(|job| (job.clone(), vec![false; dates.len()]))
            .collect();
        Self { dates, columns }
    }

    /// Row dates, ascending and unique.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Column names, sorted.
    pub fn jobs(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn has_job(&self, job: &str) -> bool {
        self.columns.contains_key(job)
    }

    /// Whether `job` is on record as having synchronized `date`.
    pub fn is_complete(&self, date: NaiveDate, job: &str) -> bool {
        let Ok(row) = self.dates.binary_search(&date) else {
            return false;
        };
        self.columns
            .get(job)
            .map(|column| column[row])
            .unwrap_or(false)
    }

    /// Dates `job` still has to synchronize, ascending.
    ///
    /// A job without a column is pending on every date of the matrix.
    pub fn pending_dates(&self, job: &str) -> Vec<NaiveDate> {
        match self.columns.get(job) {
            Some(column) => self
                .dates
                .iter()
                .zip(column)
                .filter(|(_, done)| !**done)
                .map(|(date, _)| *date)
                .collect(),
            None => self.dates.clone(),
        }
    }

    fn mark_complete(&mut self, date: NaiveDate, job: &str) {
        if let Ok(row) = self.dates.binary_search(&date) {
            if let Some(column) = self.columns.get_mut(job) {
                column[row] = true;
            }
        }
    }
}

/// Inputs for [`build_state_matrix`].
#[derive(Debug, Clone)]
pub struct MatrixRequest<'a> {
    /// Jobs named on the command line; empty means "all known jobs".
    pub requested_jobs: &'a [String],
    /// Dates forced to resynchronize; empty means "use the window".
    pub requested_dates: &'a [NaiveDate],
    pub window: SyncWindow,
    /// Every job eligible for synchronization.
    pub known_jobs: &'a [String],
    /// Completion records loaded for the window.
    pub history: &'a [CompletionRecord],
}

/// The matrix plus the jobs to execute this run, in execution order.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub matrix: StateMatrix,
    pub jobs: Vec<String>,
}

/// Reconcile history, the requested window and the job list.
///
/// - Explicit dates: a matrix over exactly those dates for the effective
///   jobs, every cell pending regardless of history.
/// - Otherwise: every window date × every known or requested job, with
///   cells set from history. Jobs with no history are pending across the
///   whole window.
///
/// The effective job list is `requested_jobs` when non-empty, else
/// `known_jobs`.
pub fn build_state_matrix(request: MatrixRequest<'_>) -> RunPlan {
    let jobs = dedup(if request.requested_jobs.is_empty() {
        request.known_jobs
    } else {
        request.requested_jobs
    });

    if !request.requested_dates.is_empty() {
        let mut dates = request.requested_dates.to_vec();
        dates.sort();
        dates.dedup();
        tracing::info!(
            "Forcing {} date(s) to resynchronize for {} job(s)",
            dates.len(),
            jobs.len()
        );
        return RunPlan {
            matrix: StateMatrix::pending(dates, &jobs),
            jobs,
        };
    }

    let columns: Vec<String> = dedup(
        &request
            .known_jobs
            .iter()
            .chain(request.requested_jobs)
            .cloned()
            .collect::<Vec<_>>(),
    );
    let mut matrix = StateMatrix::pending(request.window.dates(), &columns);
    for record in request.history {
        matrix.mark_complete(record.date, &record.job_name);
    }

    RunPlan { matrix, jobs }
}

fn dedup(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|n| seen.insert(n.as_str()))
        .cloned()
        .collect()
}
