//! MySQL backend for ts-sync
//!
//! Provides a [`sync_core::Connection`] over a `mysql_async` pool and a
//! [`sync_state::CompletionStore`] that keeps completion records in a
//! MySQL table.

mod client;
mod connection;
mod state;
pub mod statements;
pub mod testing;
mod value;

pub use client::{new_mysql_pool, sanitize_connection_string};
pub use connection::{MySqlConnection, DEFAULT_BATCH_SIZE};
pub use state::{MySqlCompletionStore, StateTables};
pub use value::{from_mysql, to_mysql, ConversionError};
