//! Zero-capacity hand-off between the producer and the insert workers.
//!
//! Idle workers register a one-shot slot on a request channel and wait on it. The producer
//! takes the oldest registered slot and moves the job into it, so [`JobQueueTx::send`] only
//! completes once a worker is holding the job and at most one job per worker is ever in
//! flight. Nothing is buffered between the two sides.

use std::fmt;

use tokio::sync::{mpsc, oneshot};

type JobSlot<T> = oneshot::Sender<T>;

/// Error returned by [`JobQueueTx::send`] when no worker is left to take the job.
///
/// Carries the job back to the caller.
#[derive(PartialEq, Eq)]
pub struct SendError<T>(pub T);

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError").finish_non_exhaustive()
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all job queue receivers are gone")
    }
}

impl<T> std::error::Error for SendError<T> {}

/// Producer side of the job queue. Dropping it or calling [`JobQueueTx::close`] closes the
/// queue for every worker.
#[derive(Debug)]
pub struct JobQueueTx<T> {
    slots: mpsc::Receiver<JobSlot<T>>,
}

/// Worker side of the job queue, cloned once per worker.
#[derive(Debug)]
pub struct JobQueueRx<T> {
    slots: mpsc::Sender<JobSlot<T>>,
}

impl<T> Clone for JobQueueRx<T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }
}

/// Creates a job queue for up to `workers` concurrent receivers.
///
/// `workers` only sizes the slot registry; each receiver registers at most one slot at a
/// time, so registering never blocks.
pub fn create_job_queue<T>(workers: usize) -> (JobQueueTx<T>, JobQueueRx<T>) {
    let (slots_tx, slots_rx) = mpsc::channel(workers.max(1));

    (JobQueueTx { slots: slots_rx }, JobQueueRx { slots: slots_tx })
}

impl<T> JobQueueTx<T> {
    /// Hands `value` to an idle worker, waiting until one is available.
    ///
    /// Slots abandoned by workers that stopped waiting are skipped. Fails with the value once
    /// every [`JobQueueRx`] has been dropped.
    pub async fn send(&mut self, value: T) -> Result<(), SendError<T>> {
        let mut value = value;
        loop {
            let Some(slot) = self.slots.recv().await else {
                return Err(SendError(value));
            };

            match slot.send(value) {
                Ok(()) => return Ok(()),
                Err(returned) => value = returned,
            }
        }
    }

    /// Closes the queue. Workers waiting for a job observe the end of the sequence.
    pub fn close(self) {}
}

impl<T> JobQueueRx<T> {
    /// Waits for the next job, returning [`None`] once the producer has closed the queue.
    pub async fn recv(&self) -> Option<T> {
        let (slot_tx, slot_rx) = oneshot::channel();
        self.slots.send(slot_tx).await.ok()?;

        slot_rx.await.ok()
    }
}
