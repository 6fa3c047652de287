use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info_span};

use crate::concurrency::completion::CompletionTracker;
use crate::concurrency::handoff::JobQueueRx;
use crate::concurrency::signal::StatementRx;
use crate::error::{ErrorKind, LoadError, LoadResult};
use crate::inserter::RowInserter;
use crate::load_error;
use crate::types::Job;
use crate::workers::executor::InsertExecutor;
use crate::workers::insert::{InsertWorker, WorkerId};

/// Fixed-size pool of insert workers.
///
/// All workers are spawned up front by [`InsertWorkerPool::start`] and run until the job
/// queue is closed and drained. Each worker runs in an `insert_worker` span whose parent is
/// the span current when the pool was started.
#[derive(Debug)]
pub struct InsertWorkerPool {
    join_set: JoinSet<(WorkerId, LoadResult<()>)>,
    errors: Vec<LoadError>,
}

impl InsertWorkerPool {
    /// Spawns exactly `worker_count` workers sharing `executor`.
    pub fn start<I>(
        worker_count: usize,
        executor: Arc<InsertExecutor<I>>,
        queue_rx: JobQueueRx<Job>,
        statement_rx: StatementRx,
        tracker: Arc<CompletionTracker>,
        progress_log_interval: u64,
    ) -> Self
    where
        I: RowInserter + Send + Sync + 'static,
    {
        let mut join_set = JoinSet::new();
        for id in 0..worker_count {
            let worker = InsertWorker::new(
                id,
                executor.clone(),
                queue_rx.clone(),
                statement_rx.clone(),
                tracker.clone(),
                progress_log_interval,
            );

            let span = info_span!("insert_worker", worker_id = worker.id());
            join_set.spawn(async move { (id, worker.run().await) }.instrument(span));
        }

        debug!(worker_count, "started insert workers");

        Self {
            join_set,
            errors: Vec::new(),
        }
    }

    /// Number of workers that have not finished yet.
    pub fn active_workers(&self) -> usize {
        self.join_set.len()
    }

    /// Waits for every worker to finish.
    ///
    /// Worker errors and panics are collected and returned together. Cancel safe: errors
    /// gathered before cancellation are kept for the next call.
    pub async fn wait_all(&mut self) -> LoadResult<()> {
        while let Some(result) = self.join_set.join_next().await {
            match result {
                Ok((_, Ok(()))) => {}
                Ok((worker_id, Err(err))) => {
                    error!(worker_id, error = %err, "insert worker completed with error");
                    self.errors.push(err);
                }
                Err(join_err) if join_err.is_cancelled() => {
                    debug!("insert worker task was cancelled");
                }
                Err(join_err) => {
                    error!(error = %join_err, "insert worker panicked");
                    self.errors.push(load_error!(
                        ErrorKind::InsertWorkerPanic,
                        "Insert worker panicked",
                        join_err
                    ));
                }
            }
        }

        if self.errors.is_empty() {
            return Ok(());
        }

        Err(std::mem::take(&mut self.errors).into())
    }
}
