//! Infrastructure layer modules
//!
//! This module contains shared infrastructure components:
//! - `auth`: JWT issuing/validation and password hashing
//! - `config`: Application configuration and settings
//! - `error`: Unified error types
//! - `metrics`: Prometheus metrics
//! - `postgres`: PostgreSQL connection pool

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod postgres;
