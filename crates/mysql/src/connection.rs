//! [`Connection`] implementation over a `mysql_async` pool.

use std::collections::BTreeSet;

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Pool, TxOpts, Value as MySqlValue};
use sync_core::{Connection, Result, RowSet, SyncError, Value};
use tracing::debug;

use crate::client::{new_mysql_pool, sanitize_connection_string};
use crate::statements;
use crate::value::{from_mysql, to_mysql};

/// Default rows per multi-row INSERT.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

fn db_err(e: impl std::fmt::Display) -> SyncError {
    SyncError::Database(e.to_string())
}

/// A pooled MySQL database.
#[derive(Clone)]
pub struct MySqlConnection {
    pool: Pool,
    label: String,
    batch_size: usize,
}

impl MySqlConnection {
    /// Create a connection pool from a `mysql://` URL.
    ///
    /// No network I/O happens until the first query.
    pub fn from_url(url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            pool: new_mysql_pool(url)?,
            label: sanitize_connection_string(url),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: Pool, label: impl Into<String>) -> Self {
        Self {
            pool,
            label: label.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Close every pooled connection.
    pub async fn disconnect(self) -> anyhow::Result<()> {
        self.pool.disconnect().await?;
        Ok(())
    }

    fn row_params(row: &[Value]) -> Vec<MySqlValue> {
        row.iter().map(to_mysql).collect()
    }

    async fn overwrite_in_tx(
        &self,
        tx: &mut mysql_async::Transaction<'_>,
        table: &str,
        index_field: &str,
        index: usize,
        rows: &RowSet,
    ) -> std::result::Result<(), mysql_async::Error> {
        let keys: BTreeSet<String> = rows
            .rows()
            .iter()
            .filter_map(|r| match &r[index] {
                Value::Text(s) => Some(s.clone()),
                other => other.as_date().map(sync_core::format_date),
            })
            .collect();

        if !keys.is_empty() {
            let params: Vec<MySqlValue> = keys
                .iter()
                .map(|k| MySqlValue::Bytes(k.clone().into_bytes()))
                .collect();
            tx.exec_drop(statements::delete_in(table, index_field, keys.len()), params)
                .await?;
        }

        let chunk_rows = statements::rows_per_statement(self.batch_size, rows.columns().len());
        for chunk in rows.rows().chunks(chunk_rows) {
            let sql = statements::batch_insert(table, rows.columns(), chunk.len());
            let params: Vec<MySqlValue> = chunk.iter().flat_map(|r| Self::row_params(r)).collect();
            tx.exec_drop(sql, params).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for MySqlConnection {
    async fn query(&self, sql: &str) -> Result<RowSet> {
        debug!("Querying {}: {}", self.label, sql);
        let mut conn = self.pool.get_conn().await.map_err(db_err)?;
        let mut result = conn.query_iter(sql).await.map_err(db_err)?;

        let columns = result.columns().unwrap_or_else(|| Vec::new().into());
        let raw_rows: Vec<mysql_async::Row> = result.collect().await.map_err(db_err)?;
        drop(result);

        let mut set = RowSet::new(columns.iter().map(|c| c.name_str().to_string()));
        for row in raw_rows {
            let values = row
                .unwrap_raw()
                .into_iter()
                .map(|v| v.unwrap_or(MySqlValue::NULL))
                .zip(columns.iter())
                .map(|(v, c)| from_mysql(v, c))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| SyncError::Shape(e.to_string()))?;
            set.push(values)?;
        }
        Ok(set)
    }

    async fn overwrite_by_index(
        &self,
        table: &str,
        index_field: &str,
        rows: &RowSet,
    ) -> Result<()> {
        let index = rows.require_column(index_field)?;
        let mut conn = self.pool.get_conn().await.map_err(db_err)?;
        let mut tx = conn
            .start_transaction(TxOpts::default())
            .await
            .map_err(db_err)?;

        let outcome = self
            .overwrite_in_tx(&mut tx, table, index_field, index, rows)
            .await;
        match outcome {
            Ok(()) => tx.commit().await.map_err(|e| SyncError::write(table, e)),
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!("Rollback of {} failed: {}", table, rollback);
                }
                Err(SyncError::write(table, e))
            }
        }
    }

    async fn upsert(&self, table: &str, key: &[String], rows: &RowSet) -> Result<()> {
        for column in key {
            rows.require_column(column)?;
        }
        let mut conn = self.pool.get_conn().await.map_err(db_err)?;
        let mut tx = conn
            .start_transaction(TxOpts::default())
            .await
            .map_err(db_err)?;

        let sql = statements::replace_row(table, rows.columns());
        let params = rows.rows().iter().map(|r| Self::row_params(r));
        let outcome = tx.exec_batch(sql, params).await;
        match outcome {
            Ok(()) => tx.commit().await.map_err(|e| SyncError::write(table, e)),
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!("Rollback of {} failed: {}", table, rollback);
                }
                Err(SyncError::write(table, e))
            }
        }
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let (schema, name) = statements::split_table(table);
        let mut conn = self.pool.get_conn().await.map_err(db_err)?;
        let count: Option<i64> = conn
            .exec_first(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = COALESCE(?, DATABASE()) AND table_name = ?",
                (schema, name),
            )
            .await
            .map_err(db_err)?;
        Ok(count.unwrap_or(0) > 0)
    }

    async fn create_table_like(&self, table: &str, template: &str) -> Result<()> {
        let mut conn = self.pool.get_conn().await.map_err(db_err)?;
        conn.query_drop(statements::create_table_like(table, template))
            .await
            .map_err(|e| SyncError::write(table, e))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
