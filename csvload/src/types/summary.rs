use std::time::Duration;

use crate::error::{LoadError, LoadResult};
use crate::types::{DeadLetter, Header};

/// Outcome of a completed load.
#[derive(Debug, Clone)]
pub struct LoadSummary {
    /// Header of the source, absent when the source was empty.
    pub header: Option<Header>,
    /// Rows handed to the worker pool.
    pub dispatched: u64,
    /// Rows inserted successfully.
    pub inserted: u64,
    /// Rows that permanently failed, ordered by source position.
    pub failed: Vec<DeadLetter>,
    /// Whether the scan stopped early because shutdown was requested.
    pub interrupted: bool,
    /// Error that stopped the scan, such as a malformed record. Rows dispatched before it were
    /// still drained and are accounted for above.
    pub aborted: Option<LoadError>,
    pub elapsed: Duration,
}

impl LoadSummary {
    pub fn failed_count(&self) -> u64 {
        self.failed.len() as u64
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Returns the summary, or the error that stopped the scan if there was one.
    pub fn into_result(self) -> LoadResult<LoadSummary> {
        match self.aborted {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    /// Elapsed wall-clock time rounded up to whole seconds.
    pub fn elapsed_secs_ceil(&self) -> u64 {
        let secs = self.elapsed.as_secs();
        if self.elapsed.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}
