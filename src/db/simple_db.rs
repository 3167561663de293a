//! `SimpleDb` facade and per-worker sessions.
//!
//! `SimpleDb` owns the connection registry and the statement executor. Work is
//! always done through a [`WorkerSession`], which pins every call to one
//! worker id and therefore to that worker's connection and transaction.
//!
//! ```no_run
//! use simple_db::{SimpleDb, ConnectionConfig, sql_params};
//!
//! # async fn demo() -> simple_db::DbResult<()> {
//! let db = SimpleDb::new(ConnectionConfig::new("sqlite:demo.db?mode=rwc")?, false);
//! let session = db.worker("w1");
//! let id = session
//!     .insert("INSERT INTO t (name, value) VALUES (?, ?)", sql_params!["hello", 42])
//!     .await?;
//! let row = session.select_row("SELECT * FROM t WHERE id = ?", sql_params![id as i64]).await?;
//! # Ok(())
//! # }
//! ```

use crate::db::executor::QueryExecutor;
use crate::db::registry::ConnectionRegistry;
use crate::db::transaction;
use crate::db::types::{decode_scalar, row_to, rows_to};
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionConfig, Decoded, ResultShape, Row, ScalarKind, SqlValue};
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};

/// SQL execution helper with one connection per worker.
#[derive(Debug)]
pub struct SimpleDb {
    registry: ConnectionRegistry,
    dev_mode: AtomicBool,
}

impl SimpleDb {
    pub fn new(config: ConnectionConfig, dev_mode: bool) -> Self {
        Self {
            registry: ConnectionRegistry::new(config),
            dev_mode: AtomicBool::new(dev_mode),
        }
    }

    /// Toggle dev-mode SQL logging for subsequent statements.
    pub fn set_dev_mode(&self, dev_mode: bool) {
        self.dev_mode.store(dev_mode, Ordering::Relaxed);
    }

    pub fn dev_mode(&self) -> bool {
        self.dev_mode.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &ConnectionConfig {
        self.registry.config()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Session bound to `worker_id`. Creating it does not connect.
    pub fn worker(&self, worker_id: impl Into<String>) -> WorkerSession<'_> {
        WorkerSession {
            db: self,
            worker_id: worker_id.into(),
        }
    }

    /// Close one worker's connection. Returns false if it had none.
    pub async fn close(&self, worker_id: &str) -> DbResult<bool> {
        self.registry.release(worker_id).await
    }

    pub async fn close_all(&self) {
        self.registry.close_all().await
    }

    fn executor(&self) -> QueryExecutor {
        QueryExecutor::new(self.dev_mode())
    }
}

/// All calls made through one worker's connection.
#[derive(Debug, Clone)]
pub struct WorkerSession<'a> {
    db: &'a SimpleDb,
    worker_id: String,
}

impl WorkerSession<'_> {
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Run `sql` and decode its result as `shape`.
    ///
    /// The typed helpers below all go through here.
    pub async fn execute(
        &self,
        sql: &str,
        params: Vec<SqlValue>,
        shape: ResultShape,
    ) -> DbResult<Decoded> {
        let handle = self.db.registry.connection_for(&self.worker_id).await?;
        let mut worker = handle.lock().await;
        self.db
            .executor()
            .execute(&mut worker, sql, &params, shape)
            .await
    }

    // =========================================================================
    // Mutating statements
    // =========================================================================

    /// Run an `INSERT` and return the generated key.
    pub async fn insert(&self, sql: &str, params: Vec<SqlValue>) -> DbResult<u64> {
        match self.execute(sql, params, ResultShape::GeneratedKey).await? {
            Decoded::GeneratedKey(id) => Ok(id),
            other => Err(unexpected(ResultShape::GeneratedKey, &other)),
        }
    }

    /// Run any mutating statement and return the affected-row count.
    pub async fn run(&self, sql: &str, params: Vec<SqlValue>) -> DbResult<u64> {
        match self.execute(sql, params, ResultShape::AffectedRows).await? {
            Decoded::AffectedRows(n) => Ok(n),
            other => Err(unexpected(ResultShape::AffectedRows, &other)),
        }
    }

    pub async fn update(&self, sql: &str, params: Vec<SqlValue>) -> DbResult<u64> {
        self.run(sql, params).await
    }

    pub async fn delete(&self, sql: &str, params: Vec<SqlValue>) -> DbResult<u64> {
        self.run(sql, params).await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// First row, or `None` when the query matches nothing.
    pub async fn select_row(&self, sql: &str, params: Vec<SqlValue>) -> DbResult<Option<Row>> {
        match self.execute(sql, params, ResultShape::Row).await? {
            Decoded::Row(row) => Ok(row),
            other => Err(unexpected(ResultShape::Row, &other)),
        }
    }

    pub async fn select_rows(&self, sql: &str, params: Vec<SqlValue>) -> DbResult<Vec<Row>> {
        match self.execute(sql, params, ResultShape::Rows).await? {
            Decoded::Rows(rows) => Ok(rows),
            other => Err(unexpected(ResultShape::Rows, &other)),
        }
    }

    /// First row mapped onto `T` by column name.
    pub async fn select_row_as<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: Vec<SqlValue>,
    ) -> DbResult<Option<T>> {
        self.select_row(sql, params)
            .await?
            .map(row_to)
            .transpose()
    }

    pub async fn select_rows_as<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: Vec<SqlValue>,
    ) -> DbResult<Vec<T>> {
        rows_to(self.select_rows(sql, params).await?)
    }

    /// First column of the first row as text; `None` for SQL NULL.
    pub async fn select_string(&self, sql: &str, params: Vec<SqlValue>) -> DbResult<Option<String>> {
        let shape = ResultShape::Scalar(ScalarKind::String);
        match self.execute(sql, params, shape).await? {
            Decoded::String(s) => Ok(s),
            other => Err(unexpected(shape, &other)),
        }
    }

    pub async fn select_long(&self, sql: &str, params: Vec<SqlValue>) -> DbResult<i64> {
        let shape = ResultShape::Scalar(ScalarKind::Long);
        match self.execute(sql, params, shape).await? {
            Decoded::Long(n) => Ok(n),
            other => Err(unexpected(shape, &other)),
        }
    }

    /// First column of every row as a 64-bit integer.
    pub async fn select_longs(&self, sql: &str, params: Vec<SqlValue>) -> DbResult<Vec<i64>> {
        let rows = self.select_rows(sql, params).await?;
        rows.iter()
            .map(|row| match decode_scalar(row, ScalarKind::Long)? {
                Decoded::Long(n) => Ok(n),
                other => Err(unexpected(ResultShape::Scalar(ScalarKind::Long), &other)),
            })
            .collect()
    }

    pub async fn select_bool(&self, sql: &str, params: Vec<SqlValue>) -> DbResult<bool> {
        let shape = ResultShape::Scalar(ScalarKind::Bool);
        match self.execute(sql, params, shape).await? {
            Decoded::Bool(b) => Ok(b),
            other => Err(unexpected(shape, &other)),
        }
    }

    pub async fn select_datetime(
        &self,
        sql: &str,
        params: Vec<SqlValue>,
    ) -> DbResult<NaiveDateTime> {
        let shape = ResultShape::Scalar(ScalarKind::Datetime);
        match self.execute(sql, params, shape).await? {
            Decoded::Datetime(dt) => Ok(dt),
            other => Err(unexpected(shape, &other)),
        }
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    pub async fn start_transaction(&self) -> DbResult<()> {
        let handle = self.db.registry.connection_for(&self.worker_id).await?;
        let mut worker = handle.lock().await;
        transaction::begin(&mut worker).await
    }

    pub async fn commit(&self) -> DbResult<()> {
        let handle = self.db.registry.connection_for(&self.worker_id).await?;
        let mut worker = handle.lock().await;
        transaction::commit(&mut worker).await
    }

    pub async fn rollback(&self) -> DbResult<()> {
        let handle = self.db.registry.connection_for(&self.worker_id).await?;
        let mut worker = handle.lock().await;
        transaction::rollback(&mut worker).await
    }

    /// Whether this worker has an open transaction. Never connects.
    pub async fn in_transaction(&self) -> bool {
        if !self.db.registry.contains(&self.worker_id).await {
            return false;
        }
        match self.db.registry.connection_for(&self.worker_id).await {
            Ok(handle) => handle.lock().await.in_transaction(),
            Err(_) => false,
        }
    }

    /// Release this worker's connection.
    pub async fn close(&self) -> DbResult<bool> {
        self.db.close(&self.worker_id).await
    }
}

fn unexpected(shape: ResultShape, decoded: &Decoded) -> DbError {
    DbError::internal(format!(
        "Expected {:?} result, got {:?}",
        shape,
        decoded.kind()
    ))
}
