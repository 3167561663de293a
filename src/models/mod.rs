//! Data models for simple-db.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;
pub mod wise_saying;

// Re-export commonly used types
pub use connection::{ConnectionConfig, ConnectionConfigError, DatabaseType, DEFAULT_MYSQL_PORT};
pub use query::{Decoded, ResultShape, Row, ScalarKind, SqlValue};
pub use wise_saying::WiseSaying;
