use std::sync::Arc;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use eventhub_core::wallets::{PaymentCallback, Settlement};

use crate::{
    api::{success, ApiJson, ApiQuery, ApiResponse},
    error::ApiResult,
    main_lib::AppState,
};

async fn settle(
    state: &AppState,
    callback: PaymentCallback,
) -> ApiResult<Json<ApiResponse<Settlement>>> {
    tracing::info!(
        tx_ref = %callback.tx_ref,
        reported_status = %callback.status,
        "Payment callback received"
    );
    // The reported status is only a hint; the service settles from the gateway's record
    let settlement = state
        .wallet_service
        .handle_payment_callback(&callback.tx_ref, &callback.status)
        .await?;
    let message = if settlement.applied {
        "Payment status updated"
    } else {
        "Payment status unchanged"
    };
    Ok(success(message, settlement))
}

async fn callback_get(
    State(state): State<Arc<AppState>>,
    ApiQuery(callback): ApiQuery<PaymentCallback>,
) -> ApiResult<Json<ApiResponse<Settlement>>> {
    settle(&state, callback).await
}

async fn callback_post(
    State(state): State<Arc<AppState>>,
    ApiJson(callback): ApiJson<PaymentCallback>,
) -> ApiResult<Json<ApiResponse<Settlement>>> {
    settle(&state, callback).await
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/payments/callback",
        get(callback_get).post(callback_post),
    )
}
