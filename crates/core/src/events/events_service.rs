use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info, warn};

use super::events_model::{
    sort_views, Event, EventListParams, EventPage, EventQueryLimits, EventSyncSummary,
    EventUpsert, EventView, ExternalKeySet, NewLocalEvent, OrphanSweepSummary, Pagination,
};
use super::events_traits::{EventRepositoryTrait, EventServiceTrait};
use crate::catalog::{CatalogProviderTrait, ExternalEvent, SyncFailure};
use crate::categories::CategoryServiceTrait;
use crate::constants::DEFAULT_CATALOG_PAGE_SIZE;
use crate::errors::{Error, Result, ValidationError};
use crate::utils::time_utils::now_naive;

/// Service that mirrors catalog events locally and serves the merged view.
pub struct EventService {
    repository: Arc<dyn EventRepositoryTrait>,
    category_service: Arc<dyn CategoryServiceTrait>,
    provider: Arc<dyn CatalogProviderTrait>,
    limits: EventQueryLimits,
    page_size: u32,
}

impl EventService {
    pub fn new(
        repository: Arc<dyn EventRepositoryTrait>,
        category_service: Arc<dyn CategoryServiceTrait>,
        provider: Arc<dyn CatalogProviderTrait>,
    ) -> Self {
        Self {
            repository,
            category_service,
            provider,
            limits: EventQueryLimits::default(),
            page_size: DEFAULT_CATALOG_PAGE_SIZE,
        }
    }

    pub fn with_limits(mut self, limits: EventQueryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn local_category_for(&self, external: &ExternalEvent) -> Result<Option<String>> {
        match external.category_id.as_deref() {
            Some(category_id) => Ok(self
                .category_service
                .resolve_local_category(category_id)?
                .map(|c| c.id)),
            None => Ok(None),
        }
    }

    async fn sweep(&self, listing: &[ExternalEvent]) -> Result<Vec<String>> {
        let keys = ExternalKeySet::from_listing(listing);
        let deleted = self.repository.delete_orphans(keys).await?;
        if !deleted.is_empty() {
            info!(
                "Deleted {} orphaned events: {:?}",
                deleted.len(),
                deleted
            );
        }
        Ok(deleted)
    }

    /// Fetches the live record for a local event, falling back to local data.
    async fn enrich(&self, local: Event) -> EventView {
        match self.provider.get_event(&local.slug).await {
            Ok(external) => EventView::merge(local, &external, now_naive()),
            Err(e) => {
                debug!("Catalog lookup for '{}' failed: {}", local.slug, e);
                EventView::degraded(local)
            }
        }
    }
}

#[async_trait]
impl EventServiceTrait for EventService {
    async fn sync_events(&self) -> Result<EventSyncSummary> {
        let local_count_before = self.repository.count()?;
        let listing = self.provider.list_events(self.page_size).await?;
        let synced_at = now_naive();
        info!("Syncing {} events from catalog", listing.len());

        let mut created = 0;
        let mut updated = 0;
        let mut failures = Vec::new();

        for external in &listing {
            let result = match self.local_category_for(external).and_then(|category| {
                EventUpsert::from_external(external, category, synced_at)
            }) {
                Ok(upsert) => self.repository.upsert_by_event_id(upsert).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(outcome) if outcome.created => created += 1,
                Ok(_) => updated += 1,
                Err(e) => {
                    warn!(
                        "Failed to sync event id={:?} slug={:?}: {}",
                        external.id, external.slug, e
                    );
                    failures.push(SyncFailure {
                        external_id: external.external_id().map(str::to_string),
                        slug: external.slug().map(str::to_string),
                        error: e.to_string(),
                    });
                }
            }
        }

        let deleted = self.sweep(&listing).await?;
        let local_count_after = self.repository.count()?;

        info!(
            "Event sync finished: {} created, {} updated, {} failed, {} orphans deleted",
            created,
            updated,
            failures.len(),
            deleted.len()
        );

        Ok(EventSyncSummary {
            total_external: listing.len(),
            created,
            updated,
            failed: failures.len(),
            failures,
            orphans_deleted: deleted.len(),
            local_count_before,
            local_count_after,
            synced_at,
        })
    }

    async fn get_all_events(&self, params: EventListParams) -> Result<EventPage> {
        if params.cleanup_orphaned.unwrap_or(false) {
            if let Err(e) = self.cleanup_orphaned_events().await {
                warn!("Orphan cleanup before listing failed: {}", e);
            }
        }

        let query = self.limits.normalize(&params);
        let (events, total) = self.repository.search(&query)?;

        let mut views = join_all(events.into_iter().map(|event| self.enrich(event))).await;
        sort_views(&mut views, query.sort_by, query.order);

        Ok(EventPage {
            events: views,
            pagination: Pagination::new(query.page, query.limit, total),
        })
    }

    async fn get_event_by_id(&self, id: &str) -> Result<EventView> {
        let local = match self.repository.get_by_id(id)? {
            Some(event) => event,
            None => match self.repository.get_by_slug(id)? {
                Some(event) => event,
                None => self
                    .repository
                    .get_by_event_id(id)?
                    .ok_or_else(|| Error::NotFound(format!("Event '{}'", id)))?,
            },
        };
        Ok(self.enrich(local).await)
    }

    async fn cleanup_orphaned_events(&self) -> Result<OrphanSweepSummary> {
        let listing = self.provider.list_events(self.page_size).await?;
        let deleted = self.sweep(&listing).await?;
        Ok(OrphanSweepSummary {
            external_count: listing.len(),
            deleted: deleted.len(),
            deleted_event_ids: deleted,
        })
    }

    async fn create_local_event(&self, mut new_event: NewLocalEvent) -> Result<Event> {
        new_event.validate()?;
        new_event.slug = new_event.slug.trim().to_string();
        new_event.title = new_event.title.trim().to_string();

        if self.repository.get_by_slug(&new_event.slug)?.is_some() {
            return Err(ValidationError::InvalidInput(format!(
                "An event with slug '{}' already exists",
                new_event.slug
            ))
            .into());
        }
        self.repository.insert_local(new_event).await
    }
}
