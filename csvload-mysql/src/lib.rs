//! MySQL connection utilities for csvload crates.
//!
//! Builds the shared connection pool from configuration and quotes identifiers for generated
//! statements. Database lifecycle helpers for tests live behind the `test-utils` feature.

pub mod db;
pub mod quote;
pub mod sqlx;
