//! Error types for simple-db.
//!
//! Every failure in the SQL helper and the repositories is a `DbError`. Driver
//! messages are carried through unchanged so callers can diagnose the root cause.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Parameter binding failed: {message}")]
    Binding { message: String },

    #[error("SQL execution failed: {message}")]
    SqlExecution {
        message: String,
        /// e.g., "23000" for an integrity constraint violation
        sql_state: Option<String>,
    },

    #[error("No generated key returned for: {sql}")]
    NoGeneratedKey { sql: String },

    #[error("Mapping failed: {message}")]
    Mapping { message: String },

    #[error("Transaction error: {message} (worker: {worker_id})")]
    Transaction { message: String, worker_id: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a binding error.
    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding {
            message: message.into(),
        }
    }

    /// Create an execution error with optional SQL state.
    pub fn sql_execution(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::SqlExecution {
            message: message.into(),
            sql_state,
        }
    }

    pub fn no_generated_key(sql: impl Into<String>) -> Self {
        Self::NoGeneratedKey { sql: sql.into() }
    }

    /// Create a mapping error.
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
        }
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>, worker_id: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
            worker_id: worker_id.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// SQLSTATE reported by the driver, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::SqlExecution { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }
}

/// Convert sqlx errors raised while preparing, binding or executing a statement.
///
/// Connection-time failures are mapped explicitly by the registry, so anything
/// arriving here happened on an already open connection.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::sql_execution(db_err.message(), code)
            }
            sqlx::Error::Encode(source) => {
                DbError::binding(format!("Failed to encode parameter: {}", source))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::mapping(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::mapping(format!("Decode error: {}", source)),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::mapping(format!("Column not found: {}", col))
            }
            sqlx::Error::RowNotFound => DbError::sql_execution("Query returned no rows", None),
            other => DbError::sql_execution(other.to_string(), None),
        }
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::storage(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::mapping(err.to_string())
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
