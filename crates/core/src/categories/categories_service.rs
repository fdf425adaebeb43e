use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};

use super::categories_model::{CategorySyncSummary, CategoryUpsert, EventCategory};
use super::categories_traits::{CategoryRepositoryTrait, CategoryServiceTrait};
use crate::catalog::{CatalogProviderTrait, SyncFailure};
use crate::errors::Result;
use crate::utils::time_utils::now_naive;

/// Service keeping local categories in step with the external catalog.
pub struct CategoryService {
    repository: Arc<dyn CategoryRepositoryTrait>,
    provider: Arc<dyn CatalogProviderTrait>,
}

impl CategoryService {
    pub fn new(
        repository: Arc<dyn CategoryRepositoryTrait>,
        provider: Arc<dyn CatalogProviderTrait>,
    ) -> Self {
        Self {
            repository,
            provider,
        }
    }
}

#[async_trait]
impl CategoryServiceTrait for CategoryService {
    async fn sync_categories(&self) -> Result<CategorySyncSummary> {
        let external = self.provider.list_categories().await?;
        let synced_at = now_naive();
        info!("Syncing {} categories from catalog", external.len());

        let mut created = 0;
        let mut updated = 0;
        let mut failures = Vec::new();

        for category in &external {
            let result = match CategoryUpsert::from_external(category, synced_at) {
                Ok(upsert) => self.repository.upsert_by_category_id(upsert).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(outcome) if outcome.created => created += 1,
                Ok(_) => updated += 1,
                Err(e) => {
                    warn!("Failed to sync category {:?}: {}", category.id, e);
                    failures.push(SyncFailure {
                        external_id: category.id.clone(),
                        slug: None,
                        error: e.to_string(),
                    });
                }
            }
        }

        debug!(
            "Category sync: {} created, {} updated, {} failed",
            created,
            updated,
            failures.len()
        );

        Ok(CategorySyncSummary {
            total_external: external.len(),
            created,
            updated,
            failed: failures.len(),
            failures,
            synced_at,
        })
    }

    fn list_categories(&self, is_active_filter: Option<bool>) -> Result<Vec<EventCategory>> {
        self.repository.list(is_active_filter)
    }

    fn resolve_local_category(&self, external_category_id: &str) -> Result<Option<EventCategory>> {
        self.repository.get_by_category_id(external_category_id)
    }
}
