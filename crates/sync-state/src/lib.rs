//! Completion-state tracking for ts-sync
//!
//! Records which job has fully synchronized which date, and turns those
//! records into the per-run [`StateMatrix`] that decides what is pending.
//!
//! # Architecture
//!
//! - [`CompletionRecord`] - durable (date, job_name) marker
//! - [`CompletionStore`] - backend-agnostic persistence of those markers
//! - [`SyncWindow`] - the inclusive date range a run covers
//! - [`build_state_matrix`] - reconciles history, window and job list
//!
//! ## Storage Backends
//!
//! - `MySqlCompletionStore` - the `updated_state` table (ts-sync-mysql crate)
//! - [`FileStore`] - a local JSON file
//! - [`MemoryStore`] - process memory, for tests and dry runs

mod filesystem;
mod matrix;
mod memory;
pub mod store;
mod window;

#[cfg(test)]
mod tests;

pub use filesystem::FileStore;
pub use matrix::{build_state_matrix, MatrixRequest, RunPlan, StateMatrix};
pub use memory::MemoryStore;
pub use store::{CompletionRecord, CompletionStore};
pub use window::{Lookback, SyncWindow};
