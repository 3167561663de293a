//! Configuration handling for simple-db.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::error::DbResult;
use crate::models::ConnectionConfig;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "db/wiseSaying";
pub const DEFAULT_WORKER_ID: &str = "main";
pub const DEFAULT_DB_HOST: &str = "localhost";

/// Backing store for wise sayings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StoreKind {
    /// Relational database through the SQL helper
    Db,
    /// One JSON file per entity
    #[default]
    File,
    /// Process memory, gone on exit
    Memory,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Db => write!(f, "db"),
            StoreKind::File => write!(f, "file"),
            StoreKind::Memory => write!(f, "memory"),
        }
    }
}

/// Wise-saying commands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Register a new wise saying
    Register { content: String, author: String },
    /// List every wise saying, newest first
    List,
    /// Show one wise saying
    Show { id: i64 },
    /// Replace the content and author of a wise saying
    Modify {
        id: i64,
        content: String,
        author: String,
    },
    /// Delete a wise saying
    Delete { id: i64 },
    /// Print how many wise sayings are stored
    Count,
}

/// Configuration for simple-db.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "simple-db",
    about = "Wise-saying store backed by JSON files or a SQL database",
    version,
    author
)]
pub struct Config {
    /// Full database URL (mysql://... or sqlite:...). Takes precedence over
    /// the individual --db-* options.
    #[arg(long, value_name = "URL", env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// MySQL host
    #[arg(long, default_value = DEFAULT_DB_HOST, env = "SIMPLE_DB_HOST")]
    pub db_host: String,

    /// MySQL user
    #[arg(long, env = "SIMPLE_DB_USER")]
    pub db_user: Option<String>,

    /// MySQL password
    #[arg(long, env = "SIMPLE_DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// MySQL database name
    #[arg(long, env = "SIMPLE_DB_NAME")]
    pub db_name: Option<String>,

    /// Backing store
    #[arg(long, value_enum, default_value = "file", env = "SIMPLE_DB_STORE")]
    pub store: StoreKind,

    /// Directory for the file store
    #[arg(long, default_value = DEFAULT_DATA_DIR, env = "SIMPLE_DB_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Worker id the command runs as
    #[arg(long, default_value = DEFAULT_WORKER_ID)]
    pub worker: String,

    /// Log every statement with its parameters inlined
    #[arg(long, env = "SIMPLE_DB_DEV_MODE")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SIMPLE_DB_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "SIMPLE_DB_JSON_LOGS")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            database_url: None,
            db_host: DEFAULT_DB_HOST.to_string(),
            db_user: None,
            db_password: None,
            db_name: None,
            store: StoreKind::File,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            worker: DEFAULT_WORKER_ID.to_string(),
            dev_mode: false,
            log_level: "info".to_string(),
            json_logs: false,
            command: Command::List,
        }
    }

    /// Build the connection configuration for the db store.
    ///
    /// Uses `database_url` when present, otherwise assembles a MySQL URL from
    /// the individual options.
    pub fn connection_config(&self) -> DbResult<ConnectionConfig> {
        if let Some(url) = &self.database_url {
            return Ok(ConnectionConfig::new(url.as_str())?);
        }

        let user = self.db_user.as_deref().unwrap_or("root");
        let password = self.db_password.as_deref().unwrap_or("");
        let db_name = self.db_name.as_deref().ok_or_else(|| {
            crate::error::DbError::invalid_input(
                "Either --database-url or --db-name must be set for the db store",
            )
        })?;

        Ok(ConnectionConfig::mysql(
            &self.db_host,
            user,
            password,
            db_name,
        )?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
