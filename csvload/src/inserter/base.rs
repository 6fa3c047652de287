use std::future::Future;

use crate::error::LoadResult;
use crate::types::{InsertStatement, Row};

/// Target that stores one row per call.
///
/// [`RowInserter`] implementations are shared by every insert worker, so `insert_row` is
/// called concurrently. A single call is one attempt: retries are driven by the caller, which
/// classifies the returned error to decide whether another attempt is worthwhile.
///
/// Rows are not deduplicated across attempts. An attempt reported as failed that actually
/// committed on the server can lead to a duplicate row unless the target table enforces
/// uniqueness.
pub trait RowInserter {
    /// Returns the name of the inserter.
    fn name() -> &'static str;

    /// Inserts `row`, binding its values positionally into `statement`.
    fn insert_row(
        &self,
        statement: &InsertStatement,
        row: &Row,
    ) -> impl Future<Output = LoadResult<()>> + Send;
}
