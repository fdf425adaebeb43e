use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use eventhub_core::tickets::{EventTickets, PaymentStatus, Ticket};
use serde::Deserialize;

use crate::{
    api::{success, ApiQuery, ApiResponse},
    auth::{require_scope, AuthUser, Scope},
    error::ApiResult,
    main_lib::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalTicketParams {
    #[serde(alias = "payment_status")]
    payment_status: Option<String>,
}

async fn list_event_tickets(
    Path(event_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiResponse<EventTickets>>> {
    let result = state.ticket_service.list_tickets_for_event(&event_id).await?;
    let message = format!(
        "Retrieved {} tickets ({} synced, {} failed)",
        result.tickets.len(),
        result.sync.created + result.sync.updated,
        result.sync.failed
    );
    Ok(success(message, result))
}

async fn list_local_tickets(
    Path(event_id): Path<String>,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<LocalTicketParams>,
) -> ApiResult<Json<ApiResponse<Vec<Ticket>>>> {
    let payment_status = params
        .payment_status
        .as_deref()
        .map(str::parse::<PaymentStatus>)
        .transpose()?;
    let tickets = state
        .ticket_service
        .list_local_tickets(&event_id, payment_status)?;
    Ok(success("Local tickets retrieved", tickets))
}

async fn get_ticket(
    Path(ticket_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiResponse<Ticket>>> {
    let ticket = state.ticket_service.get_ticket(&ticket_id).await?;
    Ok(success("Ticket retrieved", ticket))
}

async fn redeem_ticket(
    Path(ticket_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<ApiResponse<Ticket>>> {
    let ticket = state
        .ticket_service
        .redeem_ticket(&ticket_id, &user.user_id)
        .await?;
    Ok(success("Ticket redeemed", ticket))
}

async fn unredeem_ticket(
    Path(ticket_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiResponse<Ticket>>> {
    let ticket = state.ticket_service.unredeem_ticket(&ticket_id).await?;
    Ok(success("Ticket redemption reverted", ticket))
}

/// Organizer routes. Vendors may look up and redeem tickets but not list or unredeem them.
pub fn router() -> Router<Arc<AppState>> {
    let organizer_only = Router::new()
        .route("/events/{event_id}/tickets", get(list_event_tickets))
        .route("/events/{event_id}/tickets/local", get(list_local_tickets))
        .route("/tickets/{ticket_id}/unredeem", post(unredeem_ticket))
        .route_layer(middleware::from_fn_with_state(
            Scope::Organizer,
            require_scope,
        ));

    let ticket_desk = Router::new()
        .route("/tickets/{ticket_id}", get(get_ticket))
        .route("/tickets/{ticket_id}/redeem", post(redeem_ticket))
        .route_layer(middleware::from_fn_with_state(
            Scope::TicketDesk,
            require_scope,
        ));

    organizer_only.merge(ticket_desk)
}
