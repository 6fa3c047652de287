use std::sync::Arc;

use tracing::{debug, info};

use crate::concurrency::completion::CompletionTracker;
use crate::concurrency::handoff::JobQueueRx;
use crate::concurrency::signal::StatementRx;
use crate::error::LoadResult;
use crate::inserter::RowInserter;
use crate::types::{DeadLetter, Job};
use crate::workers::executor::{InsertExecutor, InsertOutcome};

/// Identifier of an insert worker within its pool.
pub type WorkerId = usize;

/// Worker pulling jobs from the queue and inserting them one at a time.
///
/// The worker waits for the insert statement to be published before taking any job, then
/// acknowledges every job it takes on the [`CompletionTracker`], whether it was inserted or
/// dead-lettered.
#[derive(Debug)]
pub struct InsertWorker<I> {
    id: WorkerId,
    executor: Arc<InsertExecutor<I>>,
    queue_rx: JobQueueRx<Job>,
    statement_rx: StatementRx,
    tracker: Arc<CompletionTracker>,
    progress_log_interval: u64,
}

impl<I> InsertWorker<I>
where
    I: RowInserter + Send + Sync + 'static,
{
    pub fn new(
        id: WorkerId,
        executor: Arc<InsertExecutor<I>>,
        queue_rx: JobQueueRx<Job>,
        statement_rx: StatementRx,
        tracker: Arc<CompletionTracker>,
        progress_log_interval: u64,
    ) -> Self {
        Self {
            id,
            executor,
            queue_rx,
            statement_rx,
            tracker,
            progress_log_interval: progress_log_interval.max(1),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Runs the worker until the queue is closed and drained.
    pub async fn run(mut self) -> LoadResult<()> {
        let Some(statement) = self.statement_rx.wait().await else {
            debug!("source ended without a header, stopping worker");
            return Ok(());
        };

        let mut inserted: u64 = 0;
        let mut failed: u64 = 0;
        while let Some(job) = self.queue_rx.recv().await {
            match self.executor.execute(&statement, &job).await {
                InsertOutcome::Inserted { .. } => {
                    self.tracker.record_done();

                    inserted += 1;
                    if inserted % self.progress_log_interval == 0 {
                        info!(inserted, "worker progress");
                    }
                }
                InsertOutcome::Failed { attempts, error } => {
                    self.tracker
                        .record_failed(DeadLetter::new(job, attempts, error))
                        .await;

                    failed += 1;
                }
            }
        }

        debug!(inserted, failed, "job queue closed, stopping worker");

        Ok(())
    }
}
