use async_trait::async_trait;
use catalog_db::StoreError;

use super::models::{BookInstance, BookTitle, InstanceId, NewInstance, PopulatedInstance};

/// Durable store of book copies.
///
/// Reads resolve the referenced book inline. Writes are whole-record: there
/// is no partial update, and concurrent replaces of the same id are
/// last-write-wins.
#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Every copy, in creation order.
    async fn list_all(&self) -> Result<Vec<PopulatedInstance>, StoreError>;

    async fn find_by_id(&self, id: &InstanceId) -> Result<Option<PopulatedInstance>, StoreError>;

    /// Persist a new copy; the store assigns its identifier.
    async fn insert(&self, instance: NewInstance) -> Result<BookInstance, StoreError>;

    /// Overwrite every field of the copy stored under `id`.
    /// Returns `None` when no such copy exists.
    async fn replace(
        &self,
        id: &InstanceId,
        instance: NewInstance,
    ) -> Result<Option<BookInstance>, StoreError>;

    /// Remove the copy stored under `id`. Removing an absent id succeeds.
    async fn delete_by_id(&self, id: &InstanceId) -> Result<(), StoreError>;
}

/// Source of the books a copy may reference.
#[async_trait]
pub trait BookLookup: Send + Sync {
    async fn list_book_titles(&self) -> Result<Vec<BookTitle>, StoreError>;
}
