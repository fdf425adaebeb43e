//! Events module - catalog-backed event models, services, and traits.

mod events_model;
mod events_service;
mod events_traits;


pub use events_model::{
    is_orphan, sort_views, Event, EventListParams, EventPage, EventQuery, EventQueryLimits,
    EventSortField, EventSyncSummary, EventUpsert, EventView, ExternalApiStatus, ExternalKeySet,
    NewLocalEvent, OrphanSweepSummary, Pagination, SortOrder,
};
pub use events_service::EventService;
pub use events_traits::{EventRepositoryTrait, EventServiceTrait};
