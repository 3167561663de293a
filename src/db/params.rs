//! Parameter binding utilities for database queries.
//!
//! This module binds `SqlValue`s to driver-specific query objects and finds the
//! positional `?` placeholders in SQL text.
//!
//! Placeholders are found with the [sqlparser](https://docs.rs/sqlparser/)
//! tokenizer for the connection's dialect, so literals, quoted identifiers and
//! comments follow that backend's lexical rules (MySQL backslash escapes and
//! `#` comments, SQLite `[bracketed]` identifiers).

use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, SqlValue};
use sqlparser::dialect::{Dialect, MySqlDialect, SQLiteDialect};
use sqlparser::tokenizer::{Location, Token, Tokenizer};
use sqlx::mysql::MySqlArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::types::Json;
use sqlx::{MySql, Sqlite};

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: &'q SqlValue,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match param {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Timestamp(v) => query.bind(*v),
        SqlValue::Json(v) => query.bind(Json(v)),
    }
}

/// Bind a parameter to a SQLite query.
pub(crate) fn bind_sqlite_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q SqlValue,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Timestamp(v) => query.bind(*v),
        // SQLite doesn't have native JSON type, store as string
        SqlValue::Json(v) => query.bind(v.to_string()),
    }
}

/// Get the SQL dialect for the given database type.
fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// Byte offsets of every positional placeholder in `sql`, in order.
///
/// Fails with a binding error when `sql` cannot be tokenized (for example an
/// unterminated string literal).
pub fn placeholder_positions(sql: &str, db_type: DatabaseType) -> DbResult<Vec<usize>> {
    let dialect = get_dialect(db_type);
    let tokens = Tokenizer::new(dialect.as_ref(), sql)
        .tokenize_with_location()
        .map_err(|e| DbError::binding(format!("Cannot scan SQL for placeholders: {}", e)))?;

    let starts: Vec<Location> = tokens
        .into_iter()
        .filter(|t| matches!(&t.token, Token::Placeholder(p) if p == "?"))
        .map(|t| t.span.start)
        .collect();

    Ok(byte_offsets(sql, &starts))
}

/// Convert tokenizer locations (1-based line, 1-based char column) to byte
/// offsets. `locations` must be in source order.
fn byte_offsets(sql: &str, locations: &[Location]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(locations.len());
    let mut wanted = locations.iter().peekable();
    let (mut line, mut column) = (1u64, 1u64);

    for (offset, ch) in sql.char_indices() {
        let Some(next) = wanted.peek() else {
            break;
        };
        if next.line == line && next.column == column {
            offsets.push(offset);
            wanted.next();
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    offsets
}

/// Number of positional placeholders in `sql`.
pub fn count_placeholders(sql: &str, db_type: DatabaseType) -> DbResult<usize> {
    Ok(placeholder_positions(sql, db_type)?.len())
}

/// Fail unless `params` supplies exactly one value per placeholder.
pub fn check_placeholders(sql: &str, params: &[SqlValue], db_type: DatabaseType) -> DbResult<()> {
    let expected = count_placeholders(sql, db_type)?;
    if expected != params.len() {
        return Err(DbError::binding(format!(
            "SQL has {} placeholder(s) but {} parameter(s) were supplied",
            expected,
            params.len()
        )));
    }
    Ok(())
}
