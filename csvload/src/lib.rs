//! Parallel bulk loading of delimited files into a MySQL table.
//!
//! A single producer scans the source file and hands each row to a fixed pool of insert
//! workers through a zero-capacity queue, so the scan never runs further ahead than the
//! workers can absorb. Each worker executes inserts with bounded retries and acknowledges
//! every job on a shared completion tracker, which the driver waits on before returning a
//! [`types::LoadSummary`].
//!
//! The entry point is [`pipeline::LoadPipeline`]. Destinations implement
//! [`inserter::RowInserter`]; [`inserter::mysql::MySqlInserter`] targets a real database and
//! [`inserter::memory::MemoryInserter`] keeps rows in memory for tests and dry runs.

pub mod concurrency;
pub mod error;
pub mod inserter;
mod macros;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod types;
pub mod workers;
