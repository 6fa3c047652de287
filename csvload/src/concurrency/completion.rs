//! Tracking of outstanding jobs.
//!
//! The producer records every dispatch before handing a job off and each worker records the
//! terminal outcome of every job it takes. The pending counter therefore only returns to zero
//! once every dispatched job has been acknowledged, which is what [`CompletionTracker::wait_for_drain`]
//! waits for.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, gauge};
use tokio::sync::{Mutex, watch};
use tracing::{error, warn};

use crate::metrics::{
    CSVLOAD_PENDING_JOBS, CSVLOAD_ROWS_DISPATCHED_TOTAL, CSVLOAD_ROWS_FAILED_TOTAL,
    CSVLOAD_ROWS_INSERTED_TOTAL, ERROR_KIND_LABEL,
};
use crate::types::DeadLetter;

/// Counts dispatched, inserted and failed jobs for one load.
#[derive(Debug)]
pub struct CompletionTracker {
    pending: watch::Sender<u64>,
    dispatched: AtomicU64,
    inserted: AtomicU64,
    dead_letters: Mutex<Vec<DeadLetter>>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        let (pending, _) = watch::channel(0);

        Self {
            pending,
            dispatched: AtomicU64::new(0),
            inserted: AtomicU64::new(0),
            dead_letters: Mutex::new(Vec::new()),
        }
    }

    /// Records a job about to be handed off. Must precede the hand-off.
    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        counter!(CSVLOAD_ROWS_DISPATCHED_TOTAL).increment(1);

        self.pending.send_modify(|pending| {
            *pending += 1;
            gauge!(CSVLOAD_PENDING_JOBS).set(*pending as f64);
        });
    }

    /// Acknowledges a job that was inserted.
    pub fn record_done(&self) {
        self.inserted.fetch_add(1, Ordering::Relaxed);
        counter!(CSVLOAD_ROWS_INSERTED_TOTAL).increment(1);

        self.acknowledge();
    }

    /// Acknowledges a job that permanently failed and keeps it for the report.
    pub async fn record_failed(&self, dead_letter: DeadLetter) {
        warn!(
            position = %dead_letter.position,
            attempts = dead_letter.attempts,
            error = %dead_letter.error.summary(),
            "row permanently failed"
        );
        counter!(
            CSVLOAD_ROWS_FAILED_TOTAL,
            ERROR_KIND_LABEL => dead_letter.error.kind().as_label(),
        )
        .increment(1);

        self.dead_letters.lock().await.push(dead_letter);
        self.acknowledge();
    }

    /// Waits until every dispatched job has been acknowledged.
    ///
    /// Returns immediately when nothing is pending.
    pub async fn wait_for_drain(&self) {
        let mut pending = self.pending.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = pending.wait_for(|pending| *pending == 0).await;
    }

    pub fn pending(&self) -> u64 {
        *self.pending.borrow()
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn inserted(&self) -> u64 {
        self.inserted.load(Ordering::Relaxed)
    }

    /// Returns the dead letters recorded so far, ordered by source position.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        let mut dead_letters = self.dead_letters.lock().await.clone();
        dead_letters.sort_by_key(|dead_letter| dead_letter.position);

        dead_letters
    }

    fn acknowledge(&self) {
        self.pending.send_modify(|pending| {
            if *pending == 0 {
                error!("job acknowledged with no pending work, ignoring acknowledgment");
                return;
            }
            *pending -= 1;
            gauge!(CSVLOAD_PENDING_JOBS).set(*pending as f64);
        });
    }
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}
