//! In-memory wise-saying store.

use super::{WiseSayingRepository, not_found};
use async_trait::async_trait;
use crate::error::DbResult;
use crate::models::WiseSaying;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    last_id: i64,
    items: Vec<WiseSaying>,
}

/// Vector-backed store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WiseSayingRepository for MemoryRepository {
    async fn build(&self) -> DbResult<()> {
        Ok(())
    }

    async fn save(&self, mut wise_saying: WiseSaying) -> DbResult<WiseSaying> {
        let mut state = self.state.lock().await;

        if wise_saying.is_new() {
            state.last_id += 1;
            wise_saying.id = state.last_id;
            state.items.push(wise_saying.clone());
            return Ok(wise_saying);
        }

        let slot = state
            .items
            .iter_mut()
            .find(|w| w.id == wise_saying.id)
            .ok_or_else(|| not_found(wise_saying.id))?;
        *slot = wise_saying.clone();
        Ok(wise_saying)
    }

    async fn find_all(&self) -> DbResult<Vec<WiseSaying>> {
        Ok(self.state.lock().await.items.clone())
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Option<WiseSaying>> {
        let state = self.state.lock().await;
        Ok(state.items.iter().find(|w| w.id == id).cloned())
    }

    async fn delete_by_id(&self, id: i64) -> DbResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.items.len();
        state.items.retain(|w| w.id != id);
        Ok(state.items.len() != before)
    }

    async fn count(&self) -> DbResult<u64> {
        Ok(self.state.lock().await.items.len() as u64)
    }

    async fn clear(&self) -> DbResult<()> {
        *self.state.lock().await = State::default();
        Ok(())
    }
}
