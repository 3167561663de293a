//! simple-db library
//!
//! A small SQL execution helper for MySQL and SQLite with one connection per
//! logical worker, plus the wise-saying repositories built on top of it.
//!
//! - [`db::SimpleDb`]: registry of worker connections and typed query helpers
//! - [`repository`]: file, memory and database stores for [`models::WiseSaying`]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repository;

pub use config::Config;
pub use db::{SimpleDb, WorkerSession};
pub use error::{DbError, DbResult};
pub use models::{ConnectionConfig, Decoded, ResultShape, Row, ScalarKind, SqlValue, WiseSaying};
pub use repository::WiseSayingRepository;
