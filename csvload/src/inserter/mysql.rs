use sqlx::MySqlPool;
use tracing::trace;

use crate::bail;
use crate::error::{ErrorKind, LoadResult};
use crate::inserter::RowInserter;
use crate::types::{InsertStatement, Row};

/// Inserter executing statements against a MySQL connection pool.
///
/// Each attempt acquires its own connection and returns it to the pool as soon as the
/// statement completes, whatever the outcome. When every connection is busy the attempt waits
/// on the pool up to its acquire timeout, which surfaces as a retryable connection failure.
#[derive(Debug, Clone)]
pub struct MySqlInserter {
    pool: MySqlPool,
}

impl MySqlInserter {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

impl RowInserter for MySqlInserter {
    fn name() -> &'static str {
        "mysql"
    }

    async fn insert_row(&self, statement: &InsertStatement, row: &Row) -> LoadResult<()> {
        if row.arity() != statement.placeholder_count() {
            bail!(
                ErrorKind::InvalidData,
                "Row arity does not match the insert statement",
                format!(
                    "row has {} values, statement expects {}",
                    row.arity(),
                    statement.placeholder_count()
                )
            );
        }

        let mut connection = self.pool.acquire().await?;

        let mut query = sqlx::query(statement.sql());
        for value in row.values() {
            query = query.bind(value.as_str());
        }

        let result = query.execute(&mut *connection).await?;
        trace!(rows_affected = result.rows_affected(), "row inserted");

        Ok(())
    }
}
