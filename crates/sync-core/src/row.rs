//! Tabular row sets.
//!
//! A [`RowSet`] is an ordered collection of rows sharing one column list.
//! "Empty" (zero rows) and "absent" (`Option::<RowSet>::None`) are distinct
//! states throughout the engine: an empty set means a query matched
//! nothing, an absent one means there is nothing to process at all.

use serde::{Deserialize, Serialize};

use crate::{Result, SyncError, Value};

/// A single row, positionally aligned with [`RowSet::columns`].
pub type Row = Vec<Value>;

/// Ordered rows with named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl RowSet {
    /// Create an empty row set with the given columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row.
    pub fn push(&mut self, row: Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(SyncError::Shape(format!(
                "row has {} values but the row set has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Builder-style [`RowSet::push`].
    pub fn with_row<I, V>(mut self, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push(values.into_iter().map(Into::into).collect())?;
        Ok(self)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of a column by name, or a shape error naming the column.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            SyncError::Shape(format!(
                "column '{name}' not found in [{}]",
                self.columns.join(", ")
            ))
        })
    }

    /// Value at (`row`, `column`).
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All values of one column.
    pub fn column_values(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Rewrite every value of one column in place.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&Value) -> Result<Value>,
    {
        let idx = self.require_column(name)?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx])?;
        }
        Ok(())
    }

    /// Keep only rows for which `keep` returns true.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Row) -> bool,
    {
        self.rows.retain(keep);
    }

    /// Drop columns by position, preserving the order of the rest.
    pub fn drop_columns(&mut self, positions: &[usize]) {
        if positions.is_empty() {
            return;
        }
        let keep: Vec<bool> = (0..self.columns.len())
            .map(|i| !positions.contains(&i))
            .collect();
        let mut i = 0;
        self.columns.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
        for row in &mut self.rows {
            let mut i = 0;
            row.retain(|_| {
                let k = keep[i];
                i += 1;
                k
            });
        }
    }

    /// A row set with the same columns holding only the given rows.
    pub fn with_same_columns(&self, rows: Vec<Row>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RowSet {
        RowSet::new(["date", "amount", "note"])
            .with_row([Value::text("2024-01-01"), Value::Int(1), Value::Null])
            .unwrap()
            .with_row([Value::text("2024-01-02"), Value::Int(2), Value::text("x")])
            .unwrap()
    }

    #[test]
    fn test_push_rejects_wrong_width() {
        let mut set = RowSet::new(["a", "b"]);
        let err = set.push(vec![Value::Int(1)]).unwrap_err();
        assert!(matches!(err, SyncError::Shape(_)));
        assert!(set.is_empty());
    }

    #[test]
    fn test_column_lookup() {
        let set = sample();
        assert_eq!(set.column_index("amount"), Some(1));
        assert_eq!(set.get(1, "note"), Some(&Value::text("x")));
        assert!(set.require_column("missing").is_err());
        assert_eq!(
            set.column_values("amount").unwrap(),
            vec![&Value::Int(1), &Value::Int(2)]
        );
    }

    #[test]
    fn test_map_column_and_retain() {
        let mut set = sample();
        set.map_column("amount", |v| Ok(Value::Int(v.as_i64().unwrap_or(0) * 10)))
            .unwrap();
        set.retain(|row| !row[2].is_null());
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0, "amount"), Some(&Value::Int(20)));
    }

    #[test]
    fn test_drop_columns_keeps_alignment() {
        let mut set = sample();
        set.drop_columns(&[1]);
        assert_eq!(set.columns(), &["date".to_string(), "note".to_string()]);
        assert_eq!(set.rows()[1], vec![Value::text("2024-01-02"), Value::text("x")]);
    }
}
