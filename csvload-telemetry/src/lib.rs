//! Logging and metrics initialization shared by csvload binaries and tests.

pub mod metrics;
pub mod tracing;
