//! Error taxonomy shared by readers, writers and backends.

use thiserror::Error;

/// Errors raised while synchronizing a job.
///
/// Only [`SyncError::Config`] is fatal to a whole run, and only when it is
/// raised before the first job starts; everything else is isolated to the
/// job that hit it.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing connection alias, missing default connection, bad settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data did not have the shape a reader or writer needs.
    #[error("Shape mismatch: {0}")]
    Shape(String),

    /// A write was rolled back.
    #[error("Write to '{table}' failed: {message}")]
    Write { table: String, message: String },

    /// Lower-level driver failure outside of a write transaction.
    #[error("Database error: {0}")]
    Database(String),

    /// A value could not be understood as a calendar date.
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

impl SyncError {
    /// Build a [`SyncError::Write`] for `table`.
    pub fn write(table: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Write {
            table: table.into(),
            message: message.to_string(),
        }
    }
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, SyncError>;
