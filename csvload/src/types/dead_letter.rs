use crate::error::LoadError;
use crate::types::{Job, SourcePosition};

/// A job that permanently failed, kept for the final report.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub position: SourcePosition,
    pub values: Vec<String>,
    /// Insert attempts made before giving up. Zero when the job never reached a worker.
    pub attempts: u32,
    pub error: LoadError,
}

impl DeadLetter {
    pub fn new(job: Job, attempts: u32, error: LoadError) -> Self {
        Self {
            position: job.position,
            values: job.row.into_values(),
            attempts,
            error,
        }
    }
}
