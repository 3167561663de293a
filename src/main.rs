//! simple-db - Main entry point.
//!
//! Runs one wise-saying command against the configured store.

use clap::Parser;
use simple_db::config::{Command, Config, StoreKind};
use simple_db::db::SimpleDb;
use simple_db::error::{DbError, DbResult};
use simple_db::models::WiseSaying;
use simple_db::repository::{DbRepository, FileRepository, MemoryRepository, WiseSayingRepository};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // stdout carries command output
    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Execute `command` against `repo` and print the result.
async fn run_command(repo: &dyn WiseSayingRepository, command: &Command) -> DbResult<()> {
    repo.build().await?;

    match command {
        Command::Register { content, author } => {
            let saved = repo
                .save(WiseSaying::new(content.as_str(), author.as_str()))
                .await?;
            println!("{}번 명언이 등록되었습니다.", saved.id);
        }
        Command::List => {
            println!("번호 / 작가 / 명언");
            println!("----------------------");
            for ws in repo.find_all().await?.iter().rev() {
                println!("{} / {} / {}", ws.id, ws.author, ws.content);
            }
        }
        Command::Show { id } => match repo.find_by_id(*id).await? {
            Some(ws) => {
                println!("번호 : {}", ws.id);
                println!("작가 : {}", ws.author);
                println!("명언 : {}", ws.content);
            }
            None => println!("{}번 명언은 존재하지 않습니다.", id),
        },
        Command::Modify {
            id,
            content,
            author,
        } => match repo.find_by_id(*id).await? {
            Some(mut ws) => {
                ws.content = content.clone();
                ws.author = author.clone();
                repo.save(ws).await?;
                println!("{}번 명언이 수정되었습니다.", id);
            }
            None => println!("{}번 명언은 존재하지 않습니다.", id),
        },
        Command::Delete { id } => {
            if repo.delete_by_id(*id).await? {
                println!("{}번 명언이 삭제되었습니다.", id);
            } else {
                println!("{}번 명언은 존재하지 않습니다.", id);
            }
        }
        Command::Count => {
            println!("{}", repo.count().await?);
        }
    }

    Ok(())
}

async fn run(config: &Config) -> DbResult<()> {
    let mut db = None;
    let repo: Box<dyn WiseSayingRepository> = match config.store {
        StoreKind::File => Box::new(FileRepository::new(&config.data_dir)),
        StoreKind::Memory => Box::new(MemoryRepository::new()),
        StoreKind::Db => {
            let connection = config.connection_config()?;
            info!(
                db_type = %connection.db_type,
                url = %connection.masked_connection_string(),
                worker_id = %config.worker,
                "Using database store"
            );
            let simple_db = Arc::new(SimpleDb::new(connection, config.dev_mode));
            db = Some(Arc::clone(&simple_db));
            Box::new(DbRepository::new(simple_db, config.worker.as_str()))
        }
    };

    let result = run_command(repo.as_ref(), &config.command).await;
    if let Some(db) = db {
        db.close_all().await;
    }
    result
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!(
        store = %config.store,
        "Starting simple-db v{}",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = run(&config).await {
        error!(error = %e, "Command failed");
        if let DbError::Connection { suggestion, .. } = &e {
            eprintln!("Hint: {}", suggestion);
        }
        return Err(e.into());
    }

    Ok(())
}
