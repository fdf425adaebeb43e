use async_trait::async_trait;

use super::events_model::{
    Event, EventListParams, EventPage, EventQuery, EventSyncSummary, EventUpsert, EventView,
    ExternalKeySet, NewLocalEvent, OrphanSweepSummary,
};
use crate::catalog::UpsertOutcome;
use crate::errors::Result;

/// Persistence contract for events.
#[async_trait]
pub trait EventRepositoryTrait: Send + Sync {
    fn count(&self) -> Result<i64>;

    /// Inserts or updates the event with the same catalog `event_id`.
    async fn upsert_by_event_id(&self, upsert: EventUpsert) -> Result<UpsertOutcome<Event>>;

    /// Inserts an event with no catalog id.
    async fn insert_local(&self, new_event: NewLocalEvent) -> Result<Event>;

    /// Returns one page of events matching the query plus the total match count.
    fn search(&self, query: &EventQuery) -> Result<(Vec<Event>, i64)>;

    fn get_by_id(&self, id: &str) -> Result<Option<Event>>;

    fn get_by_slug(&self, slug: &str) -> Result<Option<Event>>;

    fn get_by_event_id(&self, event_id: &str) -> Result<Option<Event>>;

    /// Deletes every tracked event that is an orphan with respect to `keys`
    /// and returns the catalog ids of the deleted rows.
    async fn delete_orphans(&self, keys: ExternalKeySet) -> Result<Vec<String>>;
}

/// Event operations exposed to the API layer and the scheduler.
#[async_trait]
pub trait EventServiceTrait: Send + Sync {
    async fn sync_events(&self) -> Result<EventSyncSummary>;

    async fn get_all_events(&self, params: EventListParams) -> Result<EventPage>;

    /// Resolves by local id, then slug, then catalog id.
    async fn get_event_by_id(&self, id: &str) -> Result<EventView>;

    async fn cleanup_orphaned_events(&self) -> Result<OrphanSweepSummary>;

    async fn create_local_event(&self, new_event: NewLocalEvent) -> Result<Event>;
}
