//! Database-backed wise-saying store.

use super::{WiseSayingRepository, not_found};
use async_trait::async_trait;
use crate::db::{SimpleDb, WorkerSession};
use crate::error::DbResult;
use crate::models::{DatabaseType, WiseSaying};
use crate::sql_params;
use std::sync::Arc;

const CREATE_TABLE_MYSQL: &str = "CREATE TABLE IF NOT EXISTS wise_saying (\
    id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY, \
    content VARCHAR(1000) NOT NULL, \
    author VARCHAR(100) NOT NULL\
    )";

const CREATE_TABLE_SQLITE: &str = "CREATE TABLE IF NOT EXISTS wise_saying (\
    id INTEGER PRIMARY KEY AUTOINCREMENT, \
    content TEXT NOT NULL, \
    author TEXT NOT NULL\
    )";

/// Stores wise sayings in the `wise_saying` table, always through one worker.
#[derive(Debug, Clone)]
pub struct DbRepository {
    db: Arc<SimpleDb>,
    worker_id: String,
}

impl DbRepository {
    pub fn new(db: Arc<SimpleDb>, worker_id: impl Into<String>) -> Self {
        Self {
            db,
            worker_id: worker_id.into(),
        }
    }

    fn session(&self) -> WorkerSession<'_> {
        self.db.worker(self.worker_id.as_str())
    }
}

#[async_trait]
impl WiseSayingRepository for DbRepository {
    async fn build(&self) -> DbResult<()> {
        let ddl = match self.db.config().db_type {
            DatabaseType::MySQL => CREATE_TABLE_MYSQL,
            DatabaseType::SQLite => CREATE_TABLE_SQLITE,
        };
        self.session().run(ddl, sql_params![]).await?;
        Ok(())
    }

    async fn save(&self, mut wise_saying: WiseSaying) -> DbResult<WiseSaying> {
        let session = self.session();

        if wise_saying.is_new() {
            let id = session
                .insert(
                    "INSERT INTO wise_saying (content, author) VALUES (?, ?)",
                    sql_params![wise_saying.content.as_str(), wise_saying.author.as_str()],
                )
                .await?;
            wise_saying.id = i64::try_from(id).map_err(|_| {
                crate::error::DbError::mapping(format!("Generated id {} exceeds i64", id))
            })?;
            return Ok(wise_saying);
        }

        let changed = session
            .update(
                "UPDATE wise_saying SET content = ?, author = ? WHERE id = ?",
                sql_params![
                    wise_saying.content.as_str(),
                    wise_saying.author.as_str(),
                    wise_saying.id
                ],
            )
            .await?;
        if changed == 0 && self.find_by_id(wise_saying.id).await?.is_none() {
            return Err(not_found(wise_saying.id));
        }
        Ok(wise_saying)
    }

    async fn find_all(&self) -> DbResult<Vec<WiseSaying>> {
        self.session()
            .select_rows_as(
                "SELECT id, content, author FROM wise_saying ORDER BY id ASC",
                sql_params![],
            )
            .await
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Option<WiseSaying>> {
        self.session()
            .select_row_as(
                "SELECT id, content, author FROM wise_saying WHERE id = ?",
                sql_params![id],
            )
            .await
    }

    async fn delete_by_id(&self, id: i64) -> DbResult<bool> {
        let deleted = self
            .session()
            .delete("DELETE FROM wise_saying WHERE id = ?", sql_params![id])
            .await?;
        Ok(deleted > 0)
    }

    async fn count(&self) -> DbResult<u64> {
        let count = self
            .session()
            .select_long("SELECT COUNT(*) FROM wise_saying", sql_params![])
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn clear(&self) -> DbResult<()> {
        let session = self.session();
        match self.db.config().db_type {
            DatabaseType::MySQL => {
                session.run("TRUNCATE wise_saying", sql_params![]).await?;
            }
            DatabaseType::SQLite => {
                session.run("DELETE FROM wise_saying", sql_params![]).await?;
                // AUTOINCREMENT keeps its high-water mark here
                session
                    .run(
                        "DELETE FROM sqlite_sequence WHERE name = 'wise_saying'",
                        sql_params![],
                    )
                    .await?;
            }
        }
        Ok(())
    }
}
