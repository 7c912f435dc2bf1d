//! The database capability the engine consumes.
//!
//! Backends (MySQL, the in-memory test double) implement [`Connection`];
//! readers and writers only ever talk to this trait.

use async_trait::async_trait;

use crate::{Result, RowSet};

/// A live handle to one logical database.
///
/// Write operations must each run in a single transaction of their own:
/// either all of their effects become visible or none do.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Run a query and collect every row.
    async fn query(&self, sql: &str) -> Result<RowSet>;

    /// Replace the rows of `table` for every distinct value of
    /// `index_field` present in `rows`.
    ///
    /// Deletes existing rows whose `index_field` matches any of those
    /// values, then appends `rows`, in one transaction.
    async fn overwrite_by_index(&self, table: &str, index_field: &str, rows: &RowSet)
        -> Result<()>;

    /// Insert-or-replace `rows` into a table whose unique key is `key`.
    ///
    /// Runs in one transaction; on failure nothing is applied and a
    /// [`crate::SyncError::Write`] is returned.
    async fn upsert(&self, table: &str, key: &[String], rows: &RowSet) -> Result<()>;

    /// Whether `table` exists.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Create `table` with the same definition as `template`.
    async fn create_table_like(&self, table: &str, template: &str) -> Result<()>;

    /// Short description for logs. Must not leak credentials.
    fn describe(&self) -> String;
}
