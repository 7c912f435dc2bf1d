//! In-memory [`Connection`] for tests and dry runs.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;
use sync_core::{format_date, Connection, Result, RowSet, SyncError, Value};
use tokio::sync::Mutex;

/// A write the connection accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Overwrite of `table` on the distinct index `keys`, ascending
    Overwrite { table: String, keys: Vec<String> },
    Upsert { table: String, rows: usize },
    CreateLike { table: String, template: String },
}

#[derive(Default)]
struct State {
    tables: BTreeMap<String, RowSet>,
    responses: Vec<(String, RowSet)>,
    failing_queries: Vec<String>,
    failing_tables: HashSet<String>,
    queries: Vec<String>,
    writes: Vec<WriteOp>,
}

/// Tables held in process memory.
///
/// Queries are answered from canned responses matched by substring, so
/// tests control exactly what each source returns. Writes apply to the
/// in-memory tables with the same semantics as a SQL backend.
pub struct MemoryConnection {
    name: String,
    state: Mutex<State>,
}

fn key_of(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Date(d) => format_date(*d),
        other => format!("{other:?}"),
    }
}

impl MemoryConnection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Answer every query containing `pattern` with `rows`.
    ///
    /// Earlier registrations win over later ones.
    pub async fn respond(&self, pattern: impl Into<String>, rows: RowSet) {
        self.state.lock().await.responses.push((pattern.into(), rows));
    }

    /// Make every query containing `pattern` fail.
    pub async fn fail_queries_matching(&self, pattern: impl Into<String>) {
        self.state.lock().await.failing_queries.push(pattern.into());
    }

    /// Make every write to `table`, including its creation, fail and leave
    /// it untouched.
    pub async fn fail_writes_to(&self, table: impl Into<String>) {
        self.state.lock().await.failing_tables.insert(table.into());
    }

    pub async fn create_table(&self, table: impl Into<String>, rows: RowSet) {
        self.state.lock().await.tables.insert(table.into(), rows);
    }

    pub async fn table(&self, table: &str) -> Option<RowSet> {
        self.state.lock().await.tables.get(table).cloned()
    }

    pub async fn queries(&self) -> Vec<String> {
        self.state.lock().await.queries.clone()
    }

    pub async fn writes(&self) -> Vec<WriteOp> {
        self.state.lock().await.writes.clone()
    }
}

impl State {
    fn check_writable(&self, table: &str) -> Result<()> {
        if self.failing_tables.contains(table) {
            return Err(SyncError::write(table, "injected write failure"));
        }
        Ok(())
    }

    /// The stored table, created with `rows`' columns on first write.
    fn table_for(&mut self, table: &str, rows: &RowSet) -> Result<&mut RowSet> {
        let stored = self
            .tables
            .entry(table.to_string())
            .or_insert_with(|| RowSet::new(rows.columns().iter().cloned()));
        if stored.columns() != rows.columns() {
            return Err(SyncError::write(
                table,
                format!(
                    "columns [{}] do not match table columns [{}]",
                    rows.columns().join(", "),
                    stored.columns().join(", ")
                ),
            ));
        }
        Ok(stored)
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn query(&self, sql: &str) -> Result<RowSet> {
        let mut state = self.state.lock().await;
        state.queries.push(sql.to_string());
        if state.failing_queries.iter().any(|p| sql.contains(p.as_str())) {
            return Err(SyncError::Database(format!("injected query failure: {sql}")));
        }
        Ok(state
            .responses
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn overwrite_by_index(&self, table: &str, index_field: &str, rows: &RowSet) -> Result<()> {
        let index = rows.require_column(index_field)?;
        let mut state = self.state.lock().await;
        state.check_writable(table)?;

        let keys: BTreeSet<String> = rows.rows().iter().map(|r| key_of(&r[index])).collect();
        let stored = state.table_for(table, rows)?;
        stored.retain(|r| !keys.contains(&key_of(&r[index])));
        for row in rows.rows() {
            stored.push(row.clone())?;
        }

        state.writes.push(WriteOp::Overwrite {
            table: table.to_string(),
            keys: keys.into_iter().collect(),
        });
        Ok(())
    }

    async fn upsert(&self, table: &str, key: &[String], rows: &RowSet) -> Result<()> {
        let key_columns = key
            .iter()
            .map(|k| rows.require_column(k))
            .collect::<Result<Vec<_>>>()?;
        let mut state = self.state.lock().await;
        state.check_writable(table)?;

        let stored = state.table_for(table, rows)?;
        for row in rows.rows() {
            let same_key = |r: &Vec<Value>| key_columns.iter().all(|&c| r[c] == row[c]);
            stored.retain(|r| !same_key(r));
            stored.push(row.clone())?;
        }

        state.writes.push(WriteOp::Upsert {
            table: table.to_string(),
            rows: rows.len(),
        });
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.state.lock().await.tables.contains_key(table))
    }

    async fn create_table_like(&self, table: &str, template: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_writable(table)?;
        let columns = state
            .tables
            .get(template)
            .map(|t| t.columns().to_vec())
            .ok_or_else(|| SyncError::write(table, format!("template '{template}' does not exist")))?;
        state
            .tables
            .entry(table.to_string())
            .or_insert_with(|| RowSet::new(columns));
        state.writes.push(WriteOp::CreateLike {
            table: table.to_string(),
            template: template.to_string(),
        });
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }
}
