//! Query-related data models.
//!
//! This module defines parameter values, the result shapes a caller can ask
//! for, and the decoded results handed back.

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

/// One decoded record: column name to value, in result-set column order.
///
/// Duplicate column names keep the last value read.
pub type Row = serde_json::Map<String, JsonValue>;

/// A positional parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value
    Null,
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    /// Anything else; handed to the driver as JSON
    Json(JsonValue),
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl From<JsonValue> for SqlValue {
    fn from(v: JsonValue) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Scalar kinds a single-value query can be decoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    String,
    Long,
    Datetime,
}

/// The form of result the caller expects from a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// First column of the first row
    Scalar(ScalarKind),
    /// First row, if any
    Row,
    /// Every row
    Rows,
    /// Key generated by an INSERT
    GeneratedKey,
    /// Row count of a mutating statement
    AffectedRows,
}

impl ResultShape {
    /// True for shapes that read a result set.
    pub fn is_query(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Row | Self::Rows)
    }
}

/// A decoded statement result, one variant per `ResultShape`.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Bool(bool),
    String(Option<String>),
    Long(i64),
    Datetime(NaiveDateTime),
    Row(Option<Row>),
    Rows(Vec<Row>),
    GeneratedKey(u64),
    AffectedRows(u64),
}

impl Decoded {
    /// Name of the variant, used in shape mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Long(_) => "long",
            Self::Datetime(_) => "datetime",
            Self::Row(_) => "row",
            Self::Rows(_) => "rows",
            Self::GeneratedKey(_) => "generated key",
            Self::AffectedRows(_) => "affected rows",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_conversions() {
        assert_eq!(SqlValue::from(42), SqlValue::Int(42));
        assert_eq!(SqlValue::from("a"), SqlValue::Text("a".to_string()));
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(false)), SqlValue::Bool(false));
    }

    #[test]
    fn test_result_shape_is_query() {
        assert!(ResultShape::Row.is_query());
        assert!(ResultShape::Scalar(ScalarKind::Long).is_query());
        assert!(!ResultShape::GeneratedKey.is_query());
        assert!(!ResultShape::AffectedRows.is_query());
    }

    #[test]
    fn test_row_keeps_column_order() {
        let mut row = Row::new();
        row.insert("id".to_string(), JsonValue::from(1));
        row.insert("name".to_string(), JsonValue::from("hello"));
        row.insert("value".to_string(), JsonValue::from(42));
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "name", "value"]);
    }

    #[test]
    fn test_row_duplicate_column_keeps_last() {
        let mut row = Row::new();
        row.insert("id".to_string(), JsonValue::from(1));
        row.insert("id".to_string(), JsonValue::from(2));
        assert_eq!(row.len(), 1);
        assert_eq!(row["id"], JsonValue::from(2));
    }
}
