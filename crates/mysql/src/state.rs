//! MySQL-backed completion-state storage.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use mysql_async::prelude::*;
use mysql_async::{Pool, TxOpts};
use sync_core::{format_date, parse_date};
use sync_state::{CompletionRecord, CompletionStore};
use tracing::{debug, info};

use crate::statements;

/// Where completion records and the job catalog live.
#[derive(Debug, Clone)]
pub struct StateTables {
    /// Completion-record table
    pub table: String,
    /// Externally maintained job catalog, if any
    pub catalog_table: Option<String>,
    /// Column of `catalog_table` holding job names
    pub catalog_column: String,
}

impl Default for StateTables {
    fn default() -> Self {
        Self {
            table: "updated_state".to_string(),
            catalog_table: Some("to_update_tables".to_string()),
            catalog_column: "table_name".to_string(),
        }
    }
}

/// CompletionStore over a MySQL table with a unique (update_date, job_name) key.
pub struct MySqlCompletionStore {
    pool: Pool,
    tables: StateTables,
}

impl MySqlCompletionStore {
    pub fn new(pool: Pool, tables: StateTables) -> Self {
        Self { pool, tables }
    }

    pub fn tables(&self) -> &StateTables {
        &self.tables
    }
}

#[async_trait]
impl CompletionStore for MySqlCompletionStore {
    async fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.pool.get_conn().await?;
        conn.query_drop(statements::create_state_table(&self.tables.table))
            .await
            .with_context(|| format!("Failed to create state table '{}'", self.tables.table))?;
        debug!("Ensured state table {}", self.tables.table);
        Ok(())
    }

    async fn load_since(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CompletionRecord>> {
        let mut conn = self.pool.get_conn().await?;
        let rows: Vec<(Option<String>, String)> = conn
            .exec(
                statements::select_state(&self.tables.table),
                (format_date(start), format_date(end)),
            )
            .await
            .with_context(|| format!("Failed to load state from '{}'", self.tables.table))?;

        let mut records = Vec::with_capacity(rows.len());
        for (date, job_name) in rows {
            // Rows without a date can never match a window date
            let Some(date) = date else { continue };
            records.push(CompletionRecord::new(parse_date(&date)?, job_name));
        }
        Ok(records)
    }

    async fn commit(&self, job_name: &str, dates: &[NaiveDate]) -> Result<()> {
        if dates.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.get_conn().await?;
        let mut tx = conn.start_transaction(TxOpts::default()).await?;

        let mut delete_params = vec![mysql_async::Value::from(job_name)];
        delete_params.extend(dates.iter().map(|d| mysql_async::Value::from(format_date(*d))));
        tx.exec_drop(
            statements::delete_state(&self.tables.table, dates.len()),
            delete_params,
        )
        .await?;

        tx.exec_batch(
            statements::insert_state(&self.tables.table),
            dates.iter().map(|d| (format_date(*d), job_name)),
        )
        .await?;

        // Dropping an uncommitted transaction rolls it back
        tx.commit().await.with_context(|| {
            format!("Failed to commit completion state for job '{job_name}'")
        })?;

        info!(
            "Recorded {} synchronized date(s) for {} in {}",
            dates.len(),
            job_name,
            self.tables.table
        );
        Ok(())
    }

    async fn registered_jobs(&self) -> Result<Option<Vec<String>>> {
        let Some(catalog) = &self.tables.catalog_table else {
            return Ok(None);
        };
        let mut conn = self.pool.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM {}",
            statements::quote_ident(&self.tables.catalog_column),
            statements::quote_ident(catalog)
        );
        let jobs: Vec<String> = conn
            .query(sql)
            .await
            .with_context(|| format!("Failed to read job catalog '{catalog}'"))?;
        Ok(Some(jobs))
    }
}
