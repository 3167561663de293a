//! Worker-scoped transaction control.
//!
//! A transaction lives on the worker's own connection: `begin` turns
//! auto-commit off by opening an explicit transaction, `commit` and
//! `rollback` end it and auto-commit resumes. Other workers never see it.

use crate::db::connection::WorkerConnection;
use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use tracing::{debug, info};

/// Transaction boundary statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Begin,
    Commit,
    Rollback,
}

impl Boundary {
    fn sql(self, db_type: DatabaseType) -> &'static str {
        match (self, db_type) {
            (Boundary::Begin, DatabaseType::MySQL) => "START TRANSACTION",
            (Boundary::Begin, DatabaseType::SQLite) => "BEGIN",
            (Boundary::Commit, _) => "COMMIT",
            (Boundary::Rollback, _) => "ROLLBACK",
        }
    }
}

/// Begin a transaction on the worker's connection.
///
/// Auto-commit is already off while a transaction is active, so a repeated
/// `begin` leaves that transaction untouched.
pub async fn begin(worker: &mut WorkerConnection) -> DbResult<()> {
    if worker.in_transaction() {
        debug!(worker_id = %worker.worker_id(), "Transaction already active");
        return Ok(());
    }

    run_boundary(worker, Boundary::Begin).await?;
    worker.set_in_transaction(true);

    info!(worker_id = %worker.worker_id(), "Transaction started");
    Ok(())
}

/// Commit the worker's active transaction.
pub async fn commit(worker: &mut WorkerConnection) -> DbResult<()> {
    end(worker, Boundary::Commit).await?;
    info!(worker_id = %worker.worker_id(), "Transaction committed");
    Ok(())
}

/// Roll back the worker's active transaction.
pub async fn rollback(worker: &mut WorkerConnection) -> DbResult<()> {
    end(worker, Boundary::Rollback).await?;
    info!(worker_id = %worker.worker_id(), "Transaction rolled back");
    Ok(())
}

async fn end(worker: &mut WorkerConnection, boundary: Boundary) -> DbResult<()> {
    if !worker.in_transaction() {
        return Err(DbError::transaction(
            "No active transaction",
            worker.worker_id(),
        ));
    }

    let result = run_boundary(worker, boundary).await;
    // COMMIT may fail and leave the transaction open; ROLLBACK always ends it
    if result.is_ok() || boundary == Boundary::Rollback {
        worker.set_in_transaction(false);
    }
    result
}

async fn run_boundary(worker: &mut WorkerConnection, boundary: Boundary) -> DbResult<()> {
    let worker_id = worker.worker_id().to_string();
    let conn = worker.conn_mut()?;
    let sql = boundary.sql(conn.db_type());

    let result = impl_db_dispatch!(conn, {
        MySql(c) => sqlx::raw_sql(sql).execute(&mut *c).await.map(|_| ()),
        SQLite(c) => sqlx::raw_sql(sql).execute(&mut *c).await.map(|_| ()),
    });

    result.map_err(|e| DbError::transaction(format!("{} failed: {}", sql, e), worker_id))
}
