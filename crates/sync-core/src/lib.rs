//! Core types for the ts-sync framework.
//!
//! This crate provides the foundational types shared by every other
//! crate in the workspace:
//!
//! - [`Value`] - A single cell, with temporal values kept typed
//! - [`RowSet`] - Ordered rows with named columns
//! - [`Connection`] - The database capability readers and writers use
//! - [`SyncError`] - The error taxonomy of a sync run
//! - [`date`] - Calendar date parsing and SQL rendering helpers
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── sync-state      (completion records and the state matrix)
//!    ├─── ts-sync-mysql   (implements Connection for MySQL)
//!    └─── ts-sync         (sources, targets, job execution)
//! ```
//!
//! # Example
//!
//! ```rust
//! use sync_core::{RowSet, Value};
//!
//! let rows = RowSet::new(["date", "amount"])
//!     .with_row([Value::text("2024-01-01"), Value::Int(42)])
//!     .unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

pub mod connection;
pub mod date;
pub mod error;
pub mod row;
pub mod values;

pub use connection::Connection;
pub use date::{
    date_from_value, date_range, format_date, parse_date, sql_date_list, year_of, DATE_FORMAT,
};
pub use error::{Result, SyncError};
pub use row::{Row, RowSet};
pub use values::Value;
