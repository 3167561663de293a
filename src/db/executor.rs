//! Statement execution engine.
//!
//! This module runs one statement on a worker's connection:
//! - classifies it by its leading keyword (`SELECT`, `INSERT`, anything else)
//! - checks the requested result shape against that classification
//! - binds the positional parameters
//! - executes and decodes the result into the requested shape
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific fetch and write operations
//! - `sqlite`: SQLite-specific fetch and write operations
//!
//! Both submodules expose the same functions adapted to the driver's types.

use crate::db::connection::{DbConnection, WorkerConnection};
use crate::db::debug_sql::render_debug_sql;
use crate::db::params::check_placeholders;
use crate::db::types::{DecodeRow, decode_scalar};
use crate::error::{DbError, DbResult};
use crate::models::{Decoded, ResultShape, Row, SqlValue};
use futures_util::TryStreamExt;
use tracing::{debug, info};

/// Log target for dev-mode SQL rendering.
pub const SQL_LOG_TARGET: &str = "simple_db::sql";

/// Statement class, decided by a case-sensitive prefix of the trimmed SQL.
///
/// Lowercase keywords, CTEs (`WITH ...`) and anything else that does not start
/// with the literal `SELECT` / `INSERT` fall into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Other,
}

impl StatementKind {
    pub fn classify(sql: &str) -> Self {
        let trimmed = sql.trim_start();
        if trimmed.starts_with("SELECT") {
            Self::Select
        } else if trimmed.starts_with("INSERT") {
            Self::Insert
        } else {
            Self::Other
        }
    }
}

/// Outcome of a mutating statement.
#[derive(Debug, Clone, Copy)]
struct WriteOutcome {
    rows_affected: u64,
    /// 0 when the driver has no key to report
    last_insert_id: u64,
}

/// Executes statements on a worker's connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryExecutor {
    dev_mode: bool,
}

impl QueryExecutor {
    /// Create a new executor. With `dev_mode` every statement is logged with
    /// its parameters inlined before it runs.
    pub fn new(dev_mode: bool) -> Self {
        Self { dev_mode }
    }

    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Execute `sql` with `params` and decode the result as `shape`.
    pub async fn execute(
        &self,
        worker: &mut WorkerConnection,
        sql: &str,
        params: &[SqlValue],
        shape: ResultShape,
    ) -> DbResult<Decoded> {
        let db_type = worker.db_type();

        // Logged before validation so rejected statements show up too
        if self.dev_mode {
            info!(
                target: SQL_LOG_TARGET,
                worker_id = %worker.worker_id(),
                sql = %render_debug_sql(sql, params, db_type),
                "sql (debug rendering, not executed)"
            );
        }

        let kind = StatementKind::classify(sql);
        validate_shape(kind, shape)?;
        check_placeholders(sql, params, db_type)?;

        debug!(
            worker_id = %worker.worker_id(),
            sql = %sql,
            params = params.len(),
            kind = ?kind,
            shape = ?shape,
            "Executing statement"
        );

        let conn = worker.conn_mut()?;

        match (kind, shape) {
            (StatementKind::Select, ResultShape::Scalar(scalar)) => {
                let row = fetch_first(conn, sql, params).await?.ok_or_else(|| {
                    DbError::sql_execution("Query returned no rows for a scalar result", None)
                })?;
                decode_scalar(&row, scalar)
            }
            (StatementKind::Select, ResultShape::Row) => {
                Ok(Decoded::Row(fetch_first(conn, sql, params).await?))
            }
            (StatementKind::Select, _) => {
                let rows = fetch_all(conn, sql, params).await?;
                debug!(row_count = rows.len(), "Query returned rows");
                Ok(Decoded::Rows(rows))
            }
            (StatementKind::Insert, ResultShape::GeneratedKey) => {
                let outcome = execute_write(conn, sql, params).await?;
                if outcome.rows_affected == 0 || outcome.last_insert_id == 0 {
                    return Err(DbError::no_generated_key(sql));
                }
                debug!(generated_key = outcome.last_insert_id, "Insert generated key");
                Ok(Decoded::GeneratedKey(outcome.last_insert_id))
            }
            _ => {
                let outcome = execute_write(conn, sql, params).await?;
                debug!(rows_affected = outcome.rows_affected, "Statement executed");
                Ok(Decoded::AffectedRows(outcome.rows_affected))
            }
        }
    }
}

/// Reject shape/statement combinations before anything is sent to the driver.
fn validate_shape(kind: StatementKind, shape: ResultShape) -> DbResult<()> {
    match (kind, shape) {
        (StatementKind::Select, s) if s.is_query() => Ok(()),
        (StatementKind::Select, s) => Err(DbError::invalid_input(format!(
            "{:?} cannot be read from a SELECT statement",
            s
        ))),
        (StatementKind::Insert, ResultShape::GeneratedKey) => Ok(()),
        (_, ResultShape::GeneratedKey) => Err(DbError::invalid_input(
            "A generated key can only be requested for a statement starting with INSERT",
        )),
        (_, ResultShape::AffectedRows) => Ok(()),
        (_, s) => Err(DbError::invalid_input(format!(
            "{:?} requires a statement starting with SELECT",
            s
        ))),
    }
}

// =============================================================================
// Dispatch Helpers
// =============================================================================

async fn fetch_first(
    conn: &mut DbConnection,
    sql: &str,
    params: &[SqlValue],
) -> DbResult<Option<Row>> {
    match conn {
        DbConnection::MySql(c) => mysql::fetch_first(c, sql, params).await,
        DbConnection::SQLite(c) => sqlite::fetch_first(c, sql, params).await,
    }
}

async fn fetch_all(conn: &mut DbConnection, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>> {
    match conn {
        DbConnection::MySql(c) => mysql::fetch_all(c, sql, params).await,
        DbConnection::SQLite(c) => sqlite::fetch_all(c, sql, params).await,
    }
}

async fn execute_write(
    conn: &mut DbConnection,
    sql: &str,
    params: &[SqlValue],
) -> DbResult<WriteOutcome> {
    match conn {
        DbConnection::MySql(c) => mysql::execute_write(c, sql, params).await,
        DbConnection::SQLite(c) => sqlite::execute_write(c, sql, params).await,
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// Parameterless statements use the unprepared path, since some statements
// (DDL on MySQL in particular) are not accepted as prepared statements.

mod mysql {
    use super::*;
    use crate::db::params::bind_mysql_param;
    use sqlx::mysql::{MySqlConnection, MySqlRow};

    pub async fn fetch_first(
        conn: &mut MySqlConnection,
        sql: &str,
        params: &[SqlValue],
    ) -> DbResult<Option<Row>> {
        let row: Option<MySqlRow> = if params.is_empty() {
            use sqlx::Executor;
            conn.fetch_optional(sql).await?
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_mysql_param(query, param);
            }
            query.fetch_optional(&mut *conn).await?
        };
        Ok(row.map(|r| r.to_row()))
    }

    pub async fn fetch_all(
        conn: &mut MySqlConnection,
        sql: &str,
        params: &[SqlValue],
    ) -> DbResult<Vec<Row>> {
        let rows: Vec<MySqlRow> = if params.is_empty() {
            use sqlx::Executor;
            conn.fetch(sql).try_collect().await?
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_mysql_param(query, param);
            }
            query.fetch(&mut *conn).try_collect().await?
        };
        Ok(rows.iter().map(|r| r.to_row()).collect())
    }

    pub async fn execute_write(
        conn: &mut MySqlConnection,
        sql: &str,
        params: &[SqlValue],
    ) -> DbResult<WriteOutcome> {
        let result = if params.is_empty() {
            use sqlx::Executor;
            conn.execute(sql).await?
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_mysql_param(query, param);
            }
            query.execute(&mut *conn).await?
        };
        Ok(WriteOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_id(),
        })
    }
}

mod sqlite {
    use super::*;
    use crate::db::params::bind_sqlite_param;
    use sqlx::sqlite::{SqliteConnection, SqliteRow};

    pub async fn fetch_first(
        conn: &mut SqliteConnection,
        sql: &str,
        params: &[SqlValue],
    ) -> DbResult<Option<Row>> {
        let row: Option<SqliteRow> = if params.is_empty() {
            use sqlx::Executor;
            conn.fetch_optional(sql).await?
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_sqlite_param(query, param);
            }
            query.fetch_optional(&mut *conn).await?
        };
        Ok(row.map(|r| r.to_row()))
    }

    pub async fn fetch_all(
        conn: &mut SqliteConnection,
        sql: &str,
        params: &[SqlValue],
    ) -> DbResult<Vec<Row>> {
        let rows: Vec<SqliteRow> = if params.is_empty() {
            use sqlx::Executor;
            conn.fetch(sql).try_collect().await?
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_sqlite_param(query, param);
            }
            query.fetch(&mut *conn).try_collect().await?
        };
        Ok(rows.iter().map(|r| r.to_row()).collect())
    }

    pub async fn execute_write(
        conn: &mut SqliteConnection,
        sql: &str,
        params: &[SqlValue],
    ) -> DbResult<WriteOutcome> {
        let result = if params.is_empty() {
            use sqlx::Executor;
            conn.execute(sql).await?
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_sqlite_param(query, param);
            }
            query.execute(&mut *conn).await?
        };
        Ok(WriteOutcome {
            rows_affected: result.rows_affected(),
            // rowids are positive for every inserted row
            last_insert_id: u64::try_from(result.last_insert_rowid()).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionConfig, ScalarKind};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    async fn memory_worker() -> WorkerConnection {
        let config = ConnectionConfig::new("sqlite::memory:").unwrap();
        let conn = DbConnection::open(&config).await.unwrap();
        WorkerConnection::new("test", conn)
    }

    /// Log sink shared between the subscriber and the test.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(StatementKind::classify("SELECT 1"), StatementKind::Select);
        assert_eq!(
            StatementKind::classify("  \nSELECT 1"),
            StatementKind::Select
        );
        assert_eq!(
            StatementKind::classify("INSERT INTO t VALUES (1)"),
            StatementKind::Insert
        );
        assert_eq!(
            StatementKind::classify("UPDATE t SET a = 1"),
            StatementKind::Other
        );
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        assert_eq!(StatementKind::classify("select 1"), StatementKind::Other);
        assert_eq!(
            StatementKind::classify("WITH x AS (SELECT 1) SELECT * FROM x"),
            StatementKind::Other
        );
    }

    #[test]
    fn test_validate_shape() {
        assert!(validate_shape(StatementKind::Select, ResultShape::Rows).is_ok());
        assert!(validate_shape(StatementKind::Select, ResultShape::AffectedRows).is_err());
        assert!(validate_shape(StatementKind::Insert, ResultShape::GeneratedKey).is_ok());
        assert!(validate_shape(StatementKind::Insert, ResultShape::AffectedRows).is_ok());
        assert!(validate_shape(StatementKind::Other, ResultShape::GeneratedKey).is_err());
        assert!(validate_shape(StatementKind::Other, ResultShape::Row).is_err());
    }

    #[tokio::test]
    async fn test_execute_roundtrip_in_memory() {
        let executor = QueryExecutor::new(true);
        let mut worker = memory_worker().await;

        let created = executor
            .execute(
                &mut worker,
                "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)",
                &[],
                ResultShape::AffectedRows,
            )
            .await
            .unwrap();
        assert_eq!(created, Decoded::AffectedRows(0));

        let key = executor
            .execute(
                &mut worker,
                "INSERT INTO t (name) VALUES (?)",
                &[SqlValue::from("a")],
                ResultShape::GeneratedKey,
            )
            .await
            .unwrap();
        assert_eq!(key, Decoded::GeneratedKey(1));

        let count = executor
            .execute(
                &mut worker,
                "SELECT COUNT(*) FROM t",
                &[],
                ResultShape::Scalar(ScalarKind::Long),
            )
            .await
            .unwrap();
        assert_eq!(count, Decoded::Long(1));
    }

    #[tokio::test]
    async fn test_scalar_on_empty_result_is_error() {
        let executor = QueryExecutor::default();
        let mut worker = memory_worker().await;
        let err = executor
            .execute(
                &mut worker,
                "SELECT 1 WHERE 1 = 0",
                &[],
                ResultShape::Scalar(ScalarKind::Long),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::SqlExecution { .. }));
    }

    #[tokio::test]
    async fn test_placeholder_mismatch_is_binding_error() {
        let executor = QueryExecutor::default();
        let mut worker = memory_worker().await;
        let err = executor
            .execute(&mut worker, "SELECT ?", &[], ResultShape::Row)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Binding { .. }));
    }

    #[tokio::test]
    async fn test_syntax_error_is_execution_error() {
        let executor = QueryExecutor::default();
        let mut worker = memory_worker().await;
        let err = executor
            .execute(&mut worker, "SELECT FROM WHERE", &[], ResultShape::Rows)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::SqlExecution { .. }));
    }

    #[tokio::test]
    async fn test_dev_mode_logs_statements_that_fail_validation() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let executor = QueryExecutor::new(true);
        let mut worker = memory_worker().await;

        let err = executor
            .execute(
                &mut worker,
                "SELECT ? AS a, ? AS b",
                &[SqlValue::from("x")],
                ResultShape::Row,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Binding { .. }));

        let err = executor
            .execute(
                &mut worker,
                "DELETE FROM t WHERE id = ?",
                &[SqlValue::Int(7)],
                ResultShape::Rows,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));

        let output = logs.contents();
        assert!(output.contains("SELECT 'x' AS a, ? AS b"), "logs: {}", output);
        assert!(output.contains("DELETE FROM t WHERE id = 7"), "logs: {}", output);
    }

    #[tokio::test]
    async fn test_dev_mode_off_logs_nothing_on_sql_target() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let executor = QueryExecutor::default();
        let mut worker = memory_worker().await;
        executor
            .execute(&mut worker, "SELECT ?", &[SqlValue::Int(1)], ResultShape::Row)
            .await
            .unwrap();

        assert!(!logs.contents().contains(SQL_LOG_TARGET));
    }
}
