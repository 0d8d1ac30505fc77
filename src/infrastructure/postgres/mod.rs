//! PostgreSQL persistence module.
//!
//! Provides connection pooling for the user directory.

pub mod pool;

pub use pool::{PostgresPool, PostgresPoolError};
