//! JSON-file wise-saying store.
//!
//! Layout under the data directory:
//! - `<id>.json`: one pretty-printed entity per file
//! - `lastId.txt`: the last id handed out, as decimal text

use super::{WiseSayingRepository, not_found};
use async_trait::async_trait;
use crate::error::{DbError, DbResult};
use crate::models::WiseSaying;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

const LAST_ID_FILE: &str = "lastId.txt";

#[derive(Debug)]
pub struct FileRepository {
    dir: PathBuf,
    /// Serializes id assignment and writes within this process
    write_lock: Mutex<()>,
}

impl FileRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entity_path(&self, id: i64) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn last_id_path(&self) -> PathBuf {
        self.dir.join(LAST_ID_FILE)
    }

    async fn last_id(&self) -> DbResult<i64> {
        match fs::read_to_string(self.last_id_path()).await {
            Ok(text) => text.trim().parse::<i64>().map_err(|e| {
                DbError::storage(format!("Corrupt {}: {}", LAST_ID_FILE, e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_entity(&self, wise_saying: &WiseSaying) -> DbResult<()> {
        let json = serde_json::to_string_pretty(&wise_saying.to_map())?;
        fs::write(self.entity_path(wise_saying.id), json).await?;
        debug!(id = wise_saying.id, dir = %self.dir.display(), "Wrote wise saying");
        Ok(())
    }

    async fn read_entity(path: &Path) -> DbResult<WiseSaying> {
        let text = fs::read_to_string(path).await?;
        serde_json::from_str(&text).map_err(|e| {
            DbError::mapping(format!("Cannot read {}: {}", path.display(), e))
        })
    }

    /// Ids of every `<id>.json` file, ascending.
    async fn stored_ids(&self) -> DbResult<Vec<i64>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<i64>().ok())
            {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

#[async_trait]
impl WiseSayingRepository for FileRepository {
    async fn build(&self) -> DbResult<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    async fn save(&self, mut wise_saying: WiseSaying) -> DbResult<WiseSaying> {
        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.dir).await?;

        if wise_saying.is_new() {
            let id = self.last_id().await? + 1;
            wise_saying.id = id;
            self.write_entity(&wise_saying).await?;
            fs::write(self.last_id_path(), id.to_string()).await?;
            return Ok(wise_saying);
        }

        if !fs::try_exists(self.entity_path(wise_saying.id)).await? {
            return Err(not_found(wise_saying.id));
        }
        self.write_entity(&wise_saying).await?;
        Ok(wise_saying)
    }

    async fn find_all(&self) -> DbResult<Vec<WiseSaying>> {
        let mut all = Vec::new();
        for id in self.stored_ids().await? {
            all.push(Self::read_entity(&self.entity_path(id)).await?);
        }
        Ok(all)
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Option<WiseSaying>> {
        let path = self.entity_path(id);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        Self::read_entity(&path).await.map(Some)
    }

    async fn delete_by_id(&self, id: i64) -> DbResult<bool> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(self.entity_path(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn count(&self) -> DbResult<u64> {
        Ok(self.stored_ids().await?.len() as u64)
    }

    async fn clear(&self) -> DbResult<()> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_writes_json_and_last_id() {
        let tmp = TempDir::new().unwrap();
        let repo = FileRepository::new(tmp.path().join("wiseSaying"));
        repo.build().await.unwrap();

        let saved = repo
            .save(WiseSaying::new("현재를 사랑하라.", "작자미상"))
            .await
            .unwrap();
        assert_eq!(saved.id, 1);

        let last_id = std::fs::read_to_string(repo.dir().join(LAST_ID_FILE)).unwrap();
        assert_eq!(last_id, "1");

        let json = std::fs::read_to_string(repo.dir().join("1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["content"], "현재를 사랑하라.");
        assert_eq!(value["author"], "작자미상");
    }

    #[tokio::test]
    async fn test_find_all_sorted_by_id() {
        let tmp = TempDir::new().unwrap();
        let repo = FileRepository::new(tmp.path());
        for i in 0..11 {
            repo.save(WiseSaying::new(format!("c{}", i), "a"))
                .await
                .unwrap();
        }
        let ids: Vec<i64> = repo.find_all().await.unwrap().iter().map(|w| w.id).collect();
        assert_eq!(ids, (1..=11).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_find_missing_and_delete() {
        let tmp = TempDir::new().unwrap();
        let repo = FileRepository::new(tmp.path());
        assert!(repo.find_by_id(7).await.unwrap().is_none());

        repo.save(WiseSaying::new("a", "b")).await.unwrap();
        assert!(repo.delete_by_id(1).await.unwrap());
        assert!(!repo.delete_by_id(1).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);

        // lastId survives deletion
        assert_eq!(repo.save(WiseSaying::new("c", "d")).await.unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_find_all_on_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let repo = FileRepository::new(tmp.path().join("nope"));
        assert!(repo.find_all().await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let tmp = TempDir::new().unwrap();
        let repo = FileRepository::new(tmp.path().join("ws"));
        repo.save(WiseSaying::new("a", "b")).await.unwrap();
        repo.clear().await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
        assert_eq!(repo.save(WiseSaying::new("c", "d")).await.unwrap().id, 1);
    }
}
