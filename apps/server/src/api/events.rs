use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use eventhub_core::events::{
    Event, EventListParams, EventPage, EventSyncSummary, EventView, NewLocalEvent,
    OrphanSweepSummary,
};

use crate::{
    api::{success, ApiJson, ApiQuery, ApiResponse},
    error::ApiResult,
    main_lib::AppState,
};

async fn list_events(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<EventListParams>,
) -> ApiResult<Json<ApiResponse<EventPage>>> {
    let page = state.event_service.get_all_events(params).await?;
    Ok(success("Events retrieved", page))
}

async fn get_event(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiResponse<EventView>>> {
    let event = state.event_service.get_event_by_id(&id).await?;
    Ok(success("Event retrieved", event))
}

async fn sync_events(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiResponse<EventSyncSummary>>> {
    let summary = state.event_service.sync_events().await?;
    let message = format!(
        "Synced {} events ({} created, {} updated, {} failed)",
        summary.total_external, summary.created, summary.updated, summary.failed
    );
    Ok(success(message, summary))
}

async fn cleanup_orphaned_events(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiResponse<OrphanSweepSummary>>> {
    let summary = state.event_service.cleanup_orphaned_events().await?;
    let message = format!("Deleted {} orphaned events", summary.deleted);
    Ok(success(message, summary))
}

async fn create_local_event(
    State(state): State<Arc<AppState>>,
    ApiJson(new_event): ApiJson<NewLocalEvent>,
) -> ApiResult<Json<ApiResponse<Event>>> {
    let event = state.event_service.create_local_event(new_event).await?;
    Ok(success("Event created", event))
}

pub fn public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/{id}", get(get_event))
}

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", post(create_local_event))
        .route("/events/sync", post(sync_events))
        .route("/events/cleanup", post(cleanup_orphaned_events))
}
