//! Ad-hoc query execution.
//!
//! Runs already-classified SQL on the read-only pool with a row cap and a
//! wall-clock deadline. The pool itself refuses writes, so nothing here
//! re-validates the text.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::{Column, Executor, Row, Statement, TypeInfo, ValueRef};

use common::config::QueryLimits;
use common::errors::{AppError, AppResult};

/// VM instructions between deadline checks.
const PROGRESS_HANDLER_OPS: i32 = 1_000;

/// A single value read from the store, before rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    /// Blob contents are not surfaced, only their length.
    Blob(usize),
}

/// Rows as fetched from the store.
#[derive(Debug, Clone)]
pub struct RawRows {
    /// Column names in store order.
    pub columns: Vec<String>,
    /// At most `fetch_limit` rows.
    pub rows: Vec<Vec<ScalarValue>>,
    /// Whether the store had rows beyond `fetch_limit`.
    pub has_more: bool,
    /// Time spent in the store.
    pub elapsed: Duration,
}

/// Something that can run an allowed query.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Runs `sql` and returns its rows.
    async fn run(&self, sql: &str) -> AppResult<RawRows>;
}

/// Query executor backed by the read-only SQLite pool.
#[derive(Clone)]
pub struct QueryExecutor {
    pool: SqlitePool,
    fetch_limit: usize,
    timeout: Duration,
}

impl QueryExecutor {
    /// Creates a new executor.
    pub fn new(pool: SqlitePool, fetch_limit: usize, timeout: Duration) -> Self {
        Self {
            pool,
            fetch_limit: fetch_limit.max(1),
            timeout,
        }
    }

    /// Creates an executor using the configured limits.
    pub fn from_limits(pool: SqlitePool, limits: &QueryLimits) -> Self {
        Self::new(
            pool,
            limits.fetch_limit,
            Duration::from_millis(limits.timeout_ms),
        )
    }

    async fn fetch(&self, sql: &str, deadline: Instant) -> AppResult<RawRows> {
        let start = Instant::now();
        let mut conn = self.pool.acquire().await?;

        // 到达截止时间后由 SQLite 中断语句，工作线程随之释放连接
        conn.lock_handle()
            .await?
            .set_progress_handler(PROGRESS_HANDLER_OPS, move || Instant::now() < deadline);

        let result = read_rows(&mut conn, sql, self.fetch_limit).await;

        conn.lock_handle().await?.remove_progress_handler();

        let (columns, rows, has_more) = result.map_err(|e| map_store_error(e, deadline))?;
        Ok(RawRows {
            columns,
            rows,
            has_more,
            elapsed: start.elapsed(),
        })
    }

    fn timeout_error(&self) -> AppError {
        let ms = self.timeout.as_millis() as u64;
        tracing::warn!(timeout_ms = ms, "query exceeded deadline");
        AppError::Timeout(ms)
    }
}

#[async_trait]
impl QueryRunner for QueryExecutor {
    async fn run(&self, sql: &str) -> AppResult<RawRows> {
        let deadline = Instant::now() + self.timeout;
        match tokio::time::timeout(self.timeout, self.fetch(sql, deadline)).await {
            Ok(Err(AppError::Timeout(_))) | Err(_) => Err(self.timeout_error()),
            Ok(result) => result,
        }
    }
}

/// Prepares `sql` for its column names, then reads up to `fetch_limit` rows
/// plus one more to learn whether the result continues.
async fn read_rows(
    conn: &mut SqliteConnection,
    sql: &str,
    fetch_limit: usize,
) -> Result<(Vec<String>, Vec<Vec<ScalarValue>>, bool), sqlx::Error> {
    let statement = (&mut *conn).prepare(sql).await?;
    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let mut rows = Vec::new();
    let mut has_more = false;
    let mut stream = statement.query().fetch(&mut *conn);
    while let Some(row) = stream.try_next().await? {
        if rows.len() == fetch_limit {
            has_more = true;
            break;
        }
        rows.push(decode_row(&row));
    }

    Ok((columns, rows, has_more))
}

/// Maps a store error: an interrupt after the deadline is a timeout, diagnostics
/// about the statement go back to the caller verbatim, anything else is an
/// internal failure.
fn map_store_error(err: sqlx::Error, deadline: Instant) -> AppError {
    match err {
        sqlx::Error::Database(_) if Instant::now() >= deadline => AppError::Timeout(0),
        sqlx::Error::Database(db_err) => AppError::QueryRejected(db_err.message().to_string()),
        other => AppError::Database(other.to_string()),
    }
}

/// Decodes every column of a row.
pub fn decode_row(row: &SqliteRow) -> Vec<ScalarValue> {
    (0..row.columns().len())
        .map(|index| decode_value(row, index))
        .collect()
}

/// Decodes a single column according to the value's runtime storage class.
fn decode_value(row: &SqliteRow, index: usize) -> ScalarValue {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return ScalarValue::Null,
        Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
        Err(_) => return ScalarValue::Null,
    };

    let decoded = match type_name.as_str() {
        "INTEGER" => row.try_get::<i64, _>(index).map(ScalarValue::Integer).ok(),
        "REAL" => row.try_get::<f64, _>(index).map(ScalarValue::Real).ok(),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| ScalarValue::Blob(bytes.len()))
            .ok(),
        _ => None,
    };

    decoded
        .or_else(|| row.try_get::<String, _>(index).map(ScalarValue::Text).ok())
        .or_else(|| row.try_get::<i64, _>(index).map(ScalarValue::Integer).ok())
        .or_else(|| row.try_get::<f64, _>(index).map(ScalarValue::Real).ok())
        .unwrap_or_else(|| ScalarValue::Text(format!("<{type_name}>")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_decodes_storage_classes() {
        let executor = QueryExecutor::new(memory_pool().await, 10, Duration::from_secs(5));
        let raw = executor
            .run("SELECT 1 AS i, 2.5 AS r, 'txt' AS t, NULL AS n, x'0102' AS b, '' AS e")
            .await
            .unwrap();

        assert_eq!(raw.columns, vec!["i", "r", "t", "n", "b", "e"]);
        assert_eq!(
            raw.rows[0],
            vec![
                ScalarValue::Integer(1),
                ScalarValue::Real(2.5),
                ScalarValue::Text("txt".into()),
                ScalarValue::Null,
                ScalarValue::Blob(2),
                ScalarValue::Text(String::new()),
            ]
        );
        assert!(!raw.has_more);
    }

    #[tokio::test]
    async fn test_fetch_limit_sets_has_more() {
        let executor = QueryExecutor::new(memory_pool().await, 3, Duration::from_secs(5));
        let raw = executor
            .run(
                "SELECT value FROM (SELECT 1 AS value UNION ALL SELECT 2 UNION ALL SELECT 3 \
                 UNION ALL SELECT 4 UNION ALL SELECT 5)",
            )
            .await
            .unwrap();

        assert_eq!(raw.rows.len(), 3);
        assert!(raw.has_more);
    }

    #[tokio::test]
    async fn test_columns_known_without_rows() {
        let executor = QueryExecutor::new(memory_pool().await, 10, Duration::from_secs(5));
        let raw = executor.run("SELECT 1 AS a, 2 AS b WHERE 0").await.unwrap();
        assert_eq!(raw.columns, vec!["a", "b"]);
        assert!(raw.rows.is_empty());
    }

    #[tokio::test]
    async fn test_store_rejection_keeps_diagnostic() {
        let executor = QueryExecutor::new(memory_pool().await, 10, Duration::from_secs(5));
        let err = executor
            .run("SELECT * FROM nonexistent_table")
            .await
            .unwrap_err();

        match err {
            AppError::QueryRejected(msg) => assert!(msg.contains("no such table")),
            other => panic!("expected QueryRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_query_times_out() {
        let executor = QueryExecutor::new(memory_pool().await, 10, Duration::from_millis(10));
        let err = executor
            .run(
                "SELECT count(*) FROM (WITH RECURSIVE c(x) AS \
                 (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 50000000) SELECT x FROM c)",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Timeout(10)));
    }

    #[tokio::test]
    async fn test_connection_usable_after_timeout() {
        // 单连接池：超时的语句必须被中断，连接才能再次被取用
        let executor = QueryExecutor::new(memory_pool().await, 10, Duration::from_millis(50));
        let err = executor
            .run(
                "SELECT count(*) FROM (WITH RECURSIVE c(x) AS \
                 (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT x FROM c)",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(50)));

        let raw = executor.run("SELECT 1 AS one").await.unwrap();
        assert_eq!(raw.rows, vec![vec![ScalarValue::Integer(1)]]);

        // 后续查询使用新的截止时间，不受上一次中断影响
        let raw = executor
            .run(
                "SELECT count(*) FROM (WITH RECURSIVE c(x) AS \
                 (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 1000) SELECT x FROM c)",
            )
            .await
            .unwrap();
        assert_eq!(raw.rows, vec![vec![ScalarValue::Integer(1000)]]);
    }
}
