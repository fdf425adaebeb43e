use async_trait::async_trait;

use super::categories_model::{CategorySyncSummary, CategoryUpsert, EventCategory};
use crate::catalog::UpsertOutcome;
use crate::errors::Result;

/// Persistence contract for event categories.
#[async_trait]
pub trait CategoryRepositoryTrait: Send + Sync {
    /// Inserts or updates the category with the same `category_id`.
    async fn upsert_by_category_id(
        &self,
        upsert: CategoryUpsert,
    ) -> Result<UpsertOutcome<EventCategory>>;

    fn get_by_category_id(&self, category_id: &str) -> Result<Option<EventCategory>>;

    fn list(&self, is_active_filter: Option<bool>) -> Result<Vec<EventCategory>>;
}

/// Category operations exposed to the API layer and the event sync.
#[async_trait]
pub trait CategoryServiceTrait: Send + Sync {
    /// Pulls all categories from the catalog and upserts them locally.
    async fn sync_categories(&self) -> Result<CategorySyncSummary>;

    fn list_categories(&self, is_active_filter: Option<bool>) -> Result<Vec<EventCategory>>;

    /// Maps an external category id to its local record, if it has been synced.
    fn resolve_local_category(&self, external_category_id: &str) -> Result<Option<EventCategory>>;
}
