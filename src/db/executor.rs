//! Bounded, read-only query execution.

use crate::db::validate;
use crate::error::ToolError;
use crate::types::QueryResult;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, InterruptHandle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Runs validated SQL against the shared read-only connection.
///
/// A rusqlite handle is not safe for concurrent use, so calls serialize
/// on the mutex and the blocking work runs off the async threads.
pub struct QueryExecutor {
    conn: Arc<Mutex<Connection>>,
    timeout: Duration,
    row_cap: usize,
}

impl QueryExecutor {
    pub fn new(conn: Connection, timeout: Duration, row_cap: usize) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            timeout,
            row_cap,
        }
    }

    /// Execute one read-only statement, materializing at most `row_cap`
    /// rows. On budget expiry the running query is interrupted, not left
    /// behind. Cancel-safe: dropping this future mid-query interrupts
    /// the statement, and the timeout race runs in its own task so it
    /// fires even with no caller left to poll it.
    pub async fn execute(&self, sql: &str) -> Result<QueryResult, ToolError> {
        validate::ensure_read_only(sql)?;

        let guard = self.conn.clone().lock_owned().await;
        let interrupt = guard.get_interrupt_handle();
        let finished = Arc::new(AtomicBool::new(false));
        let mut on_cancel = InterruptOnDrop::new(guard.get_interrupt_handle(), &finished);

        let sql_owned = sql.to_string();
        let row_cap = self.row_cap;
        let timeout = self.timeout;

        // The race is supervised in a spawned task: callers cancel by
        // dropping this future (REPL Ctrl-C), and the interrupt/reap
        // cleanup must not go with them.
        let supervisor = tokio::spawn(async move {
            let mut task = tokio::task::spawn_blocking(move || {
                let result = run_query(&guard, &sql_owned, row_cap);
                finished.store(true, Ordering::Release);
                result
            });

            tokio::select! {
                joined = &mut task => match joined {
                    Ok(result) => result,
                    Err(e) => Err(ToolError::Query(format!("query worker failed: {e}"))),
                },
                _ = tokio::time::sleep(timeout) => {
                    debug!("Query exceeded {:?}, interrupting", timeout);
                    interrupt.interrupt();
                    // Reap the worker so the connection lock is released.
                    let _ = task.await;
                    Err(ToolError::QueryTimeout {
                        timeout_ms: timeout.as_millis() as u64,
                    })
                }
            }
        });

        let result = match supervisor.await {
            Ok(result) => result,
            Err(e) => Err(ToolError::Query(format!("query worker failed: {e}"))),
        };
        on_cancel.disarm();
        result
    }
}

/// Interrupts the in-flight statement when dropped, unless disarmed.
///
/// Armed while `execute()` awaits the supervisor, so a cancelled call
/// takes its own query down instead of leaving it holding the
/// connection lock. The worker holds that lock until it sets
/// `finished`, so a late interrupt cannot land on a later query.
struct InterruptOnDrop {
    handle: Option<InterruptHandle>,
    finished: Arc<AtomicBool>,
}

impl InterruptOnDrop {
    fn new(handle: InterruptHandle, finished: &Arc<AtomicBool>) -> Self {
        Self {
            handle: Some(handle),
            finished: Arc::clone(finished),
        }
    }

    fn disarm(&mut self) {
        self.handle = None;
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !self.finished.load(Ordering::Acquire) {
                handle.interrupt();
            }
        }
    }
}

fn run_query(conn: &Connection, sql: &str, row_cap: usize) -> Result<QueryResult, ToolError> {
    let mut stmt = conn.prepare(sql).map_err(map_engine_error)?;

    // Engine-level backstop behind the lexical guard.
    if !stmt.readonly() {
        return Err(ToolError::DisallowedOperation(
            "statement is not read-only".into(),
        ));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let column_count = columns.len();

    let mut rows = stmt.query([]).map_err(map_engine_error)?;
    let mut out: Vec<Vec<serde_json::Value>> = Vec::new();
    let mut truncated = false;

    while let Some(row) = rows.next().map_err(map_engine_error)? {
        if out.len() == row_cap {
            truncated = true;
            break;
        }
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(value_to_json(row.get_ref(idx).map_err(map_engine_error)?));
        }
        out.push(values);
    }

    let row_count = out.len();
    Ok(QueryResult {
        columns,
        rows: out,
        row_count,
        truncated,
    })
}

fn map_engine_error(err: rusqlite::Error) -> ToolError {
    match err {
        rusqlite::Error::MultipleStatement => ToolError::MultipleStatements,
        other => ToolError::Query(other.to_string()),
    }
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Value::from(f),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned().into(),
        ValueRef::Blob(b) => hex::encode(b).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use std::path::PathBuf;
    use std::time::Instant;

    /// Never terminates on its own; only the interrupt stops it.
    const RUNAWAY: &str =
        "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT count(*) FROM c";

    fn seeded(timeout_ms: u64, row_cap: usize) -> (tempfile::TempDir, PathBuf, QueryExecutor) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exec.db");

        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE orders (id INTEGER PRIMARY KEY, item TEXT NOT NULL)")
            .unwrap();
        {
            let mut stmt = conn
                .prepare("INSERT INTO orders (item) VALUES (?1)")
                .unwrap();
            for i in 0..150 {
                stmt.execute(params![format!("item-{i}")]).unwrap();
            }
        }
        drop(conn);

        let ro = crate::db::open_read_only(&path).unwrap();
        let executor = QueryExecutor::new(ro, Duration::from_millis(timeout_ms), row_cap);
        (dir, path, executor)
    }

    fn row_total(path: &PathBuf) -> i64 {
        let conn = Connection::open(path).unwrap();
        conn.query_row("SELECT count(*) FROM orders", [], |row| row.get(0))
            .unwrap()
    }

    #[tokio::test]
    async fn returns_rows_and_columns_in_order() {
        let (_dir, _path, executor) = seeded(5_000, 100);
        let result = executor
            .execute("SELECT id, item FROM orders ORDER BY id LIMIT 3")
            .await
            .unwrap();

        assert_eq!(result.columns, vec!["id", "item"]);
        assert_eq!(result.row_count, 3);
        assert!(!result.truncated);
        assert_eq!(result.rows[0][0], serde_json::json!(1));
        assert_eq!(result.rows[0][1], serde_json::json!("item-0"));
    }

    #[tokio::test]
    async fn caps_rows_and_flags_truncation() {
        let (_dir, _path, executor) = seeded(5_000, 100);
        let result = executor.execute("SELECT id FROM orders").await.unwrap();

        assert!(result.truncated);
        assert_eq!(result.row_count, 100);
        assert_eq!(result.rows.len(), 100);
    }

    #[tokio::test]
    async fn under_cap_results_are_not_truncated() {
        let (_dir, _path, executor) = seeded(5_000, 100);
        let result = executor
            .execute("SELECT id FROM orders LIMIT 5")
            .await
            .unwrap();

        assert!(!result.truncated);
        assert_eq!(result.row_count, 5);
    }

    #[tokio::test]
    async fn rejects_writes_without_touching_the_database() {
        let (_dir, path, executor) = seeded(5_000, 100);
        let before = row_total(&path);

        let err = executor
            .execute("INSERT INTO orders (item) VALUES ('x')")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "disallowed_operation");

        let err = executor.execute("DROP TABLE orders").await.unwrap_err();
        assert_eq!(err.kind(), "disallowed_operation");

        assert_eq!(row_total(&path), before);
    }

    #[tokio::test]
    async fn rejects_chained_statements() {
        let (_dir, _path, executor) = seeded(5_000, 100);
        let err = executor.execute("SELECT 1; SELECT 2").await.unwrap_err();
        assert_eq!(err.kind(), "multiple_statements");
    }

    #[tokio::test]
    async fn engine_errors_come_back_structured() {
        let (_dir, _path, executor) = seeded(5_000, 100);
        let err = executor.execute("SELECT * FROM no_such").await.unwrap_err();
        assert_eq!(err.kind(), "query_error");
        assert!(err.to_string().contains("no_such"));
    }

    #[tokio::test]
    async fn runaway_query_times_out_and_is_interrupted() {
        let (_dir, _path, executor) = seeded(100, 100);

        let started = Instant::now();
        let err = executor.execute(RUNAWAY).await.unwrap_err();
        let elapsed = started.elapsed();

        match err {
            ToolError::QueryTimeout { timeout_ms } => assert_eq!(timeout_ms, 100),
            other => panic!("expected timeout, got {other}"),
        }
        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn connection_is_usable_after_a_timeout() {
        let (_dir, _path, executor) = seeded(100, 100);
        let _ = executor.execute(RUNAWAY).await.unwrap_err();

        let result = executor
            .execute("SELECT count(*) FROM orders")
            .await
            .unwrap();
        assert_eq!(result.rows[0][0], serde_json::json!(150));
    }

    #[tokio::test]
    async fn connection_is_freed_after_a_cancelled_call() {
        let (_dir, _path, executor) = seeded(2_000, 100);
        let executor = Arc::new(executor);

        // Cancel mid-query the way the REPL does: drop the future.
        let runaway = {
            let executor = Arc::clone(&executor);
            tokio::spawn(async move { executor.execute(RUNAWAY).await })
        };
        tokio::time::sleep(Duration::from_millis(300)).await;
        runaway.abort();
        let _ = runaway.await;

        let result = tokio::time::timeout(
            Duration::from_secs(3),
            executor.execute("SELECT count(*) FROM orders"),
        )
        .await
        .expect("follow-up query never acquired the connection")
        .unwrap();
        assert_eq!(result.rows[0][0], serde_json::json!(150));
    }

    #[tokio::test]
    async fn dynamic_values_map_to_json() {
        let (_dir, _path, executor) = seeded(5_000, 100);
        let result = executor
            .execute("SELECT NULL, 42, 1.5, 'txt', x'00ff'")
            .await
            .unwrap();

        assert_eq!(result.rows[0][0], serde_json::Value::Null);
        assert_eq!(result.rows[0][1], serde_json::json!(42));
        assert_eq!(result.rows[0][2], serde_json::json!(1.5));
        assert_eq!(result.rows[0][3], serde_json::json!("txt"));
        assert_eq!(result.rows[0][4], serde_json::json!("00ff"));
    }
}
