//! Store metrics collection.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record the duration of one store statement.
pub fn record_query_duration(operation: &str, table: &str, duration_secs: f64) {
    histogram!(
        "store_query_duration_seconds",
        "operation" => operation.to_string(),
        "table" => table.to_string()
    )
    .record(duration_secs);
}

/// Count a failed store statement.
pub fn record_query_error(operation: &str, table: &str) {
    counter!(
        "store_query_errors_total",
        "operation" => operation.to_string(),
        "table" => table.to_string()
    )
    .increment(1);
}

/// Record connection pool gauges.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active").set(active as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times a store statement and records it on completion.
///
/// ```ignore
/// let timer = QueryTimer::new("select", "profiles");
/// let result = fetch_rows(&mut qb, &mut conn).await;
/// timer.finish(&result);
/// ```
pub struct QueryTimer {
    operation: String,
    table: String,
    start: Instant,
}

impl QueryTimer {
    pub fn new(operation: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            table: table.into(),
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration, and an error count when the statement failed.
    pub fn finish<T, E>(self, result: &Result<T, E>) {
        let duration = self.start.elapsed().as_secs_f64();
        record_query_duration(&self.operation, &self.table, duration);
        if result.is_err() {
            record_query_error(&self.operation, &self.table);
        }
    }
}
