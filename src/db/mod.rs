//! Database layer.
//!
//! This module provides the SQL execution helper:
//! - One physical connection per worker, created lazily by the registry
//! - Positional parameter binding and placeholder checks
//! - Statement execution and result-shape decoding
//! - Worker-scoped transaction control
//! - Debug rendering of statements with parameters inlined
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod connection;
pub mod debug_sql;
pub mod executor;
pub mod params;
pub mod registry;
pub mod simple_db;
pub mod transaction;
pub mod types;

pub use connection::{DbConnection, WorkerConnection};
pub use debug_sql::render_debug_sql;
pub use executor::{QueryExecutor, StatementKind, SQL_LOG_TARGET};
pub use registry::{ConnectionRegistry, WorkerHandle};
pub use simple_db::{SimpleDb, WorkerSession};
