//! Wise-saying persistence.
//!
//! Three interchangeable stores implement [`WiseSayingRepository`]:
//! - `file`: one JSON document per entity plus a last-id counter
//! - `memory`: a guarded vector, mainly for tests and dry runs
//! - `db`: the `wise_saying` table through [`SimpleDb`](crate::db::SimpleDb)

pub mod db;
pub mod file;
pub mod memory;

pub use db::DbRepository;
pub use file::FileRepository;
pub use memory::MemoryRepository;

use crate::error::DbResult;
use crate::models::WiseSaying;
use async_trait::async_trait;

/// Storage operations for wise sayings.
///
/// `save` inserts when `is_new()` and returns the entity with its assigned
/// id; otherwise it overwrites the stored entity with the same id, failing
/// with `InvalidInput` if there is none.
#[async_trait]
pub trait WiseSayingRepository: Send + Sync {
    /// Prepare the backing storage (directory, table). Idempotent.
    async fn build(&self) -> DbResult<()>;

    async fn save(&self, wise_saying: WiseSaying) -> DbResult<WiseSaying>;

    /// Every stored entity in ascending id order.
    async fn find_all(&self) -> DbResult<Vec<WiseSaying>>;

    async fn find_by_id(&self, id: i64) -> DbResult<Option<WiseSaying>>;

    /// Returns false when nothing was stored under `id`.
    async fn delete_by_id(&self, id: i64) -> DbResult<bool>;

    async fn count(&self) -> DbResult<u64>;

    /// Remove every entity and reset id assignment.
    async fn clear(&self) -> DbResult<()>;
}

pub(crate) fn not_found(id: i64) -> crate::error::DbError {
    crate::error::DbError::invalid_input(format!("No wise saying with id {}", id))
}
