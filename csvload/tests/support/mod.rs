#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use csvload::concurrency::completion::CompletionTracker;
use csvload::error::{ErrorKind, LoadError, LoadResult};
use csvload::inserter::RowInserter;
use csvload::inserter::memory::MemoryInserter;
use csvload::types::{InsertStatement, Row};
use csvload_config::shared::{LoaderConfig, RetryConfig};
use tempfile::NamedTempFile;
use tokio::time::sleep;

/// Failure injected for rows whose first value matches a key.
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Fails the first `n` attempts with the given kind, then succeeds.
    FailTimes(u32, ErrorKind),
    /// Fails every attempt with the given kind.
    AlwaysFail(ErrorKind),
    /// Panics on every attempt.
    Panic,
}

#[derive(Debug, Default)]
struct State {
    faults: HashMap<String, Fault>,
    attempts: HashMap<String, u32>,
}

/// Wraps a [`MemoryInserter`], injecting failures before any row is stored.
#[derive(Debug, Clone)]
pub struct FaultInjectingInserter {
    inner: MemoryInserter,
    state: Arc<Mutex<State>>,
    delay: Duration,
}

impl FaultInjectingInserter {
    pub fn wrap(inner: MemoryInserter) -> Self {
        Self {
            inner,
            state: Arc::new(Mutex::new(State::default())),
            delay: Duration::ZERO,
        }
    }

    /// Makes every attempt take at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn inject(&self, key: &str, fault: Fault) {
        self.state
            .lock()
            .unwrap()
            .faults
            .insert(key.to_string(), fault);
    }

    /// Number of attempts made for the row whose first value is `key`.
    pub fn attempts(&self, key: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .attempts
            .get(key)
            .copied()
            .unwrap_or_default()
    }

    pub fn inner(&self) -> &MemoryInserter {
        &self.inner
    }

    /// Records the attempt and returns the injected outcome for it, if any.
    fn check_fault(&self, key: &str) -> Option<LoadResult<()>> {
        let mut state = self.state.lock().unwrap();
        let attempt = {
            let attempts = state.attempts.entry(key.to_string()).or_default();
            *attempts += 1;
            *attempts
        };

        let fault = state.faults.get(key).copied();
        // Released before a possible panic so the mutex is not poisoned.
        drop(state);

        match fault? {
            Fault::FailTimes(n, kind) if attempt <= n => {
                Some(Err(LoadError::from((kind, "Injected failure"))))
            }
            Fault::FailTimes(..) => None,
            Fault::AlwaysFail(kind) => Some(Err(LoadError::from((kind, "Injected failure")))),
            Fault::Panic => panic!("injected panic for row {key}"),
        }
    }
}

impl RowInserter for FaultInjectingInserter {
    fn name() -> &'static str {
        "fault_injecting"
    }

    async fn insert_row(&self, statement: &InsertStatement, row: &Row) -> LoadResult<()> {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let key = row.values().first().cloned().unwrap_or_default();
        if let Some(outcome) = self.check_fault(&key) {
            return outcome;
        }

        self.inner.insert_row(statement, row).await
    }
}

/// Inserter that records the highest number of unacknowledged rows seen by the tracker while
/// an insert is running.
#[derive(Debug, Clone)]
pub struct PendingSamplingInserter {
    tracker: Arc<CompletionTracker>,
    max_pending: Arc<AtomicU64>,
    delay: Duration,
}

impl PendingSamplingInserter {
    pub fn new(tracker: Arc<CompletionTracker>, delay: Duration) -> Self {
        Self {
            tracker,
            max_pending: Arc::new(AtomicU64::new(0)),
            delay,
        }
    }

    pub fn max_pending(&self) -> u64 {
        self.max_pending.load(Ordering::SeqCst)
    }

    fn sample(&self) {
        self.max_pending
            .fetch_max(self.tracker.pending(), Ordering::SeqCst);
    }
}

impl RowInserter for PendingSamplingInserter {
    fn name() -> &'static str {
        "pending_sampling"
    }

    async fn insert_row(&self, _statement: &InsertStatement, _row: &Row) -> LoadResult<()> {
        self.sample();
        sleep(self.delay).await;
        self.sample();

        Ok(())
    }
}

/// Writes `contents` to a temporary file that lives as long as the returned handle.
pub fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Builds a `domain,rank` file with `rows` data records named `row-<n>.com`.
pub fn domains_csv(rows: usize) -> String {
    let mut contents = String::from("domain,rank\n");
    for n in 1..=rows {
        contents.push_str(&format!("row-{n}.com,{n}\n"));
    }
    contents
}

pub fn loader_config(worker_count: usize) -> LoaderConfig {
    LoaderConfig {
        input_path: "unused.csv".into(),
        table: "domain".to_string(),
        worker_count,
        delimiter: ",".to_string(),
        progress_log_interval: 10,
        dead_letter_path: None,
    }
}

/// Retry settings with millisecond delays so tests stay fast.
pub fn fast_retry_config(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_retry_delay_ms: 1,
        max_retry_delay_ms: 5,
        backoff_multiplier: 2.0,
    }
}
