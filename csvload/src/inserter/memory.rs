use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::LoadResult;
use crate::inserter::RowInserter;
use crate::types::{InsertStatement, Row};

/// In-memory inserter for tests and dry runs.
///
/// Rows are kept in insertion order, which across workers is not the source order.
#[derive(Debug, Clone, Default)]
pub struct MemoryInserter {
    rows: Arc<Mutex<Vec<Row>>>,
}

impl MemoryInserter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every row inserted so far.
    pub async fn rows(&self) -> Vec<Row> {
        self.rows.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

impl RowInserter for MemoryInserter {
    fn name() -> &'static str {
        "memory"
    }

    async fn insert_row(&self, statement: &InsertStatement, row: &Row) -> LoadResult<()> {
        debug!(table = statement.table(), values = ?row.values(), "storing row in memory");
        self.rows.lock().await.push(row.clone());

        Ok(())
    }
}
