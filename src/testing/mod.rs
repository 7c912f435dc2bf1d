//! Testing utilities
//!
//! An in-memory [`sync_core::Connection`] so that the engine can be
//! exercised without a database server.

pub mod memory;

pub use memory::{MemoryConnection, WriteOp};
