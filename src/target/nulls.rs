//! Null filtering before a target write.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use sync_core::{date_from_value, Result, RowSet, SyncError};

/// Which axis incomplete data is dropped along.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NullAxis {
    /// Drop rows
    #[default]
    Rows,
    /// Drop columns
    Columns,
}

/// Which rows (or columns) count as too incomplete to write.
///
/// The default drops every row holding at least one null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullPolicy {
    pub axis: NullAxis,
    /// Columns considered; `None` considers all of them
    pub subset: Option<Vec<String>>,
    /// Minimum non-null cells to keep a row (or column); `None` requires
    /// every considered cell to be non-null
    pub min_non_null: Option<usize>,
}

impl NullPolicy {
    /// Never drop anything.
    pub fn keep_all() -> Self {
        Self {
            min_non_null: Some(0),
            ..Self::default()
        }
    }

    pub fn columns() -> Self {
        Self {
            axis: NullAxis::Columns,
            ..Self::default()
        }
    }

    pub fn subset<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subset = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn min_non_null(mut self, threshold: usize) -> Self {
        self.min_non_null = Some(threshold);
        self
    }

    /// Filter `rows` in place.
    ///
    /// Returns the dates that lost at least one row; those dates were only
    /// partially written and must not be reported complete. The Columns
    /// axis never withholds dates and never drops `index_field`.
    pub fn apply(&self, rows: &mut RowSet, index_field: &str) -> Result<BTreeSet<NaiveDate>> {
        let considered = self.considered_columns(rows, index_field)?;
        match self.axis {
            NullAxis::Rows => self.drop_rows(rows, index_field, &considered),
            NullAxis::Columns => {
                self.drop_columns(rows, &considered);
                Ok(BTreeSet::new())
            }
        }
    }

    fn considered_columns(&self, rows: &RowSet, index_field: &str) -> Result<Vec<usize>> {
        let mut positions = match &self.subset {
            Some(subset) => subset
                .iter()
                .map(|c| rows.require_column(c))
                .collect::<Result<Vec<_>>>()?,
            None => (0..rows.columns().len()).collect(),
        };
        if self.axis == NullAxis::Columns {
            let index = rows.require_column(index_field)?;
            positions.retain(|&p| p != index);
        }
        Ok(positions)
    }

    fn drop_rows(
        &self,
        rows: &mut RowSet,
        index_field: &str,
        considered: &[usize],
    ) -> Result<BTreeSet<NaiveDate>> {
        let index = rows.require_column(index_field)?;
        let threshold = self.min_non_null.unwrap_or(considered.len());
        let complete = |row: &Vec<sync_core::Value>| {
            considered.iter().filter(|&&c| !row[c].is_null()).count() >= threshold
        };

        let mut withheld = BTreeSet::new();
        for row in rows.rows() {
            if !complete(row) {
                let date = date_from_value(&row[index]).map_err(|e| {
                    SyncError::Shape(format!("index column '{index_field}': {e}"))
                })?;
                withheld.insert(date);
            }
        }
        rows.retain(complete);
        Ok(withheld)
    }

    fn drop_columns(&self, rows: &mut RowSet, considered: &[usize]) {
        let threshold = self.min_non_null.unwrap_or(rows.len());
        let sparse: Vec<usize> = considered
            .iter()
            .copied()
            .filter(|&c| rows.rows().iter().filter(|r| !r[c].is_null()).count() < threshold)
            .collect();
        rows.drop_columns(&sparse);
    }
}
