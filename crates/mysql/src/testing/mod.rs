//! Testing utilities for the MySQL backend
//!
//! Docker container management for the integration tests.

pub mod container;

pub use container::MySqlContainer;
