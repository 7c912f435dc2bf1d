//! Target writers.
//!
//! A [`TargetTable`] owns the write policy of one output table: index
//! column, null filtering, write mode and year sharding. Writing reports
//! the dates that are now fully present in the target.

pub mod nulls;
pub mod shard;

use std::collections::BTreeSet;

use chrono::NaiveDate;
use sync_core::{date_from_value, format_date, Connection, Result, RowSet, SyncError, Value};
use tracing::{info, warn};

pub use nulls::{NullAxis, NullPolicy};

/// How rows reach the physical table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Delete every existing row on the written dates, then append
    #[default]
    OverwriteByDate,
    /// Insert-or-replace on the table's unique key
    Upsert { key: Vec<String> },
}

/// What a write contributes to the job's completion commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Dates fully written; joins the intersection
    Completed(BTreeSet<NaiveDate>),
    /// The target does not take part in completion tracking
    NotTracked,
}

/// One output table of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetTable {
    /// Table name; the base name when sharded
    pub table: String,
    /// Connection alias; `None` writes to the default target connection
    pub db: Option<String>,
    pub index_field: String,
    pub nulls: NullPolicy,
    pub mode: WriteMode,
    pub sharded: bool,
    /// When false, this target's dates neither narrow nor block the commit
    pub affects_completion: bool,
}

impl TargetTable {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            db: None,
            index_field: "date".to_string(),
            nulls: NullPolicy::default(),
            mode: WriteMode::default(),
            sharded: false,
            affects_completion: true,
        }
    }

    pub fn db(mut self, alias: impl Into<String>) -> Self {
        self.db = Some(alias.into());
        self
    }

    pub fn index_field(mut self, field: impl Into<String>) -> Self {
        self.index_field = field.into();
        self
    }

    pub fn nulls(mut self, policy: NullPolicy) -> Self {
        self.nulls = policy;
        self
    }

    /// Write with insert-or-replace on the unique key `key`.
    pub fn upsert<I, S>(mut self, key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mode = WriteMode::Upsert {
            key: key.into_iter().map(Into::into).collect(),
        };
        self
    }

    pub fn sharded_by_year(mut self) -> Self {
        self.sharded = true;
        self
    }

    pub fn affects_completion(mut self, affects: bool) -> Self {
        self.affects_completion = affects;
        self
    }

    fn outcome(&self, dates: BTreeSet<NaiveDate>) -> WriteOutcome {
        if self.affects_completion {
            WriteOutcome::Completed(dates)
        } else {
            WriteOutcome::NotTracked
        }
    }

    /// Normalize, filter and persist `rows`.
    ///
    /// Dates that lost rows to null filtering are written but not reported.
    /// An empty result, before or after filtering, writes nothing and
    /// reports no dates.
    pub async fn write(&self, db: &dyn Connection, mut rows: RowSet) -> Result<WriteOutcome> {
        if rows.is_empty() {
            info!("{}: no data to synchronize", self.table);
            return Ok(self.outcome(BTreeSet::new()));
        }

        normalize_index(&mut rows, &self.index_field)?;

        let withheld = self.nulls.apply(&mut rows, &self.index_field)?;
        if !withheld.is_empty() {
            warn!(
                "{}: incomplete rows dropped, not marking {} as synchronized",
                self.table,
                join_dates(&withheld)
            );
        }
        if rows.is_empty() {
            info!("{}: no complete rows left after null filtering", self.table);
            return Ok(self.outcome(BTreeSet::new()));
        }

        let written = distinct_dates(&rows, &self.index_field)?;
        if self.sharded {
            for (year, group) in shard::split_by_year(&rows, &self.index_field)? {
                self.write_physical(db, &shard::shard_name(&self.table, year), &group)
                    .await?;
            }
        } else {
            self.write_physical(db, &self.table, &rows).await?;
        }
        info!(
            "{}: synchronized {} on {}",
            self.table,
            join_dates(&written),
            db.describe()
        );

        Ok(self.outcome(written.difference(&withheld).copied().collect()))
    }

    async fn write_physical(&self, db: &dyn Connection, table: &str, rows: &RowSet) -> Result<()> {
        match &self.mode {
            WriteMode::OverwriteByDate => db.overwrite_by_index(table, &self.index_field, rows).await,
            WriteMode::Upsert { key } => db.upsert(table, key, rows).await,
        }
    }
}

/// Rewrite the index column as canonical `YYYY-MM-DD` text.
fn normalize_index(rows: &mut RowSet, index_field: &str) -> Result<()> {
    rows.map_column(index_field, |value| {
        if value.is_null() {
            return Err(SyncError::Shape(format!(
                "index column '{index_field}' contains a null value"
            )));
        }
        let date = date_from_value(value)
            .map_err(|e| SyncError::Shape(format!("index column '{index_field}': {e}")))?;
        Ok(Value::Text(format_date(date)))
    })
}

fn distinct_dates(rows: &RowSet, index_field: &str) -> Result<BTreeSet<NaiveDate>> {
    rows.column_values(index_field)?
        .into_iter()
        .map(date_from_value)
        .collect()
}

fn join_dates(dates: &BTreeSet<NaiveDate>) -> String {
    dates
        .iter()
        .map(|d| format_date(*d))
        .collect::<Vec<_>>()
        .join(",")
}
