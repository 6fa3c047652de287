//! Metric names emitted while loading.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

static REGISTER_METRICS: Once = Once::new();

/// Label for the target table name.
pub const TABLE_NAME_LABEL: &str = "table_name";

/// Label for the inserter name.
pub const INSERTER_LABEL: &str = "inserter";

/// Label for the error kind.
pub const ERROR_KIND_LABEL: &str = "error_kind";

/// Counter of rows handed to the worker pool.
pub const CSVLOAD_ROWS_DISPATCHED_TOTAL: &str = "csvload_rows_dispatched_total";

/// Counter of rows inserted successfully.
pub const CSVLOAD_ROWS_INSERTED_TOTAL: &str = "csvload_rows_inserted_total";

/// Counter of rows that permanently failed. Labels: `table_name`, `error_kind`.
pub const CSVLOAD_ROWS_FAILED_TOTAL: &str = "csvload_rows_failed_total";

/// Counter of insert attempts that were retried. Labels: `table_name`, `error_kind`.
pub const CSVLOAD_INSERT_RETRIES_TOTAL: &str = "csvload_insert_retries_total";

/// Duration of a single insert attempt, including connection acquisition.
pub const CSVLOAD_INSERT_DURATION_SECONDS: &str = "csvload_insert_duration_seconds";

/// Gauge of jobs dispatched but not yet acknowledged.
pub const CSVLOAD_PENDING_JOBS: &str = "csvload_pending_jobs";

/// Registers metric descriptions. Safe to call multiple times.
pub fn register_metrics() {
    REGISTER_METRICS.call_once(|| {
        describe_counter!(
            CSVLOAD_ROWS_DISPATCHED_TOTAL,
            Unit::Count,
            "Rows read from the source and handed to an insert worker"
        );
        describe_counter!(
            CSVLOAD_ROWS_INSERTED_TOTAL,
            Unit::Count,
            "Rows inserted into the target table"
        );
        describe_counter!(
            CSVLOAD_ROWS_FAILED_TOTAL,
            Unit::Count,
            "Rows that permanently failed, labeled by error kind"
        );
        describe_counter!(
            CSVLOAD_INSERT_RETRIES_TOTAL,
            Unit::Count,
            "Insert attempts that failed and were retried, labeled by error kind"
        );
        describe_histogram!(
            CSVLOAD_INSERT_DURATION_SECONDS,
            Unit::Seconds,
            "Duration of a single insert attempt including connection acquisition"
        );
        describe_gauge!(
            CSVLOAD_PENDING_JOBS,
            Unit::Count,
            "Jobs dispatched to workers and not yet acknowledged"
        );
    });
}
