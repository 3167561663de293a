//! Raw SQL rendering for diagnostics.
//!
//! The output inlines parameters as literals so a logged statement can be read
//! (or pasted into a console) at a glance. It is NOT safe to execute: literal
//! escaping here only doubles single quotes, and nothing in this crate ever
//! sends a rendered string to the database.

use crate::db::params::placeholder_positions;
use crate::models::{DatabaseType, SqlValue};

/// Timestamp layout used for inlined literals.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Render `sql` with each placeholder replaced, in order, by its parameter.
///
/// Surplus placeholders stay as `?`, surplus parameters are ignored. SQL that
/// cannot be tokenized is returned unchanged. Never fails.
pub fn render_debug_sql(sql: &str, params: &[SqlValue], db_type: DatabaseType) -> String {
    let positions = placeholder_positions(sql, db_type).unwrap_or_default();
    let mut rendered = String::with_capacity(sql.len() + params.len() * 8);
    let mut last = 0;

    for (pos, param) in positions.into_iter().zip(params) {
        rendered.push_str(&sql[last..pos]);
        rendered.push_str(&format_literal(param));
        last = pos + 1;
    }
    rendered.push_str(&sql[last..]);
    rendered
}

/// Render one parameter as a SQL literal.
pub fn format_literal(param: &SqlValue) -> String {
    match param {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(v) => v.to_string().to_uppercase(),
        SqlValue::Int(v) => v.to_string(),
        SqlValue::Float(v) => v.to_string(),
        SqlValue::Text(v) => quote(v),
        SqlValue::Timestamp(v) => quote(&v.format(TIMESTAMP_FORMAT).to_string()),
        SqlValue::Json(v) => quote(&v.to_string()),
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
