use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use eventhub_core::categories::{CategorySyncSummary, EventCategory};
use serde::Deserialize;

use crate::{
    api::{success, ApiQuery, ApiResponse},
    error::ApiResult,
    main_lib::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryListParams {
    #[serde(alias = "is_active")]
    is_active: Option<bool>,
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<CategoryListParams>,
) -> ApiResult<Json<ApiResponse<Vec<EventCategory>>>> {
    let categories = state.category_service.list_categories(params.is_active)?;
    Ok(success("Categories retrieved", categories))
}

async fn sync_categories(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiResponse<CategorySyncSummary>>> {
    let summary = state.category_service.sync_categories().await?;
    let message = format!(
        "Synced {} categories ({} failed)",
        summary.total_external, summary.failed
    );
    Ok(success(message, summary))
}

pub fn public_router() -> Router<Arc<AppState>> {
    Router::new().route("/categories", get(list_categories))
}

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new().route("/categories/sync", post(sync_categories))
}
