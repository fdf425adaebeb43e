use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    routing::{get, post},
    Json, Router,
};
use eventhub_core::wallets::{
    DepositInitiation, DepositRequest, EventPaymentRequest, NewSavingsGoal, SavingsAllocation,
    SavingsGoal, SavingsWithdrawRequest, Transaction, TransactionFilter, TransactionPage,
    TransferReceipt, TransferRequest, Wallet, WalletAmountRequest,
};

use crate::{
    api::{success, ApiJson, ApiQuery, ApiResponse},
    auth::AuthUser,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<ApiResponse<Wallet>>> {
    let wallet = state.wallet_service.get_wallet(&user.user_id).await?;
    Ok(success("Wallet retrieved", wallet))
}

async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(filter): ApiQuery<TransactionFilter>,
) -> ApiResult<Json<ApiResponse<TransactionPage>>> {
    let page = state
        .wallet_service
        .list_transactions(&user.user_id, filter)
        .await?;
    Ok(success("Transactions retrieved", page))
}

async fn get_transaction(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<ApiResponse<Transaction>>> {
    let transaction = state.wallet_service.get_transaction(&user.user_id, &id)?;
    Ok(success("Transaction retrieved", transaction))
}

async fn deposit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(mut request): ApiJson<DepositRequest>,
) -> ApiResult<Json<ApiResponse<DepositInitiation>>> {
    if request.email.is_none() {
        request.email = Some(user.email.clone());
    }
    let initiation = state
        .wallet_service
        .deposit_money(&user.user_id, request)
        .await?;
    Ok(success("Checkout created", initiation))
}

async fn transfer(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(request): ApiJson<TransferRequest>,
) -> ApiResult<Json<ApiResponse<TransferReceipt>>> {
    let receipt = state
        .wallet_service
        .transfer_money(&user.user_id, request)
        .await?;
    Ok(success("Transfer completed", receipt))
}

async fn pay_for_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(request): ApiJson<EventPaymentRequest>,
) -> ApiResult<Json<ApiResponse<Transaction>>> {
    let transaction = state
        .wallet_service
        .pay_for_event(&user.user_id, request)
        .await?;
    Ok(success("Event paid", transaction))
}

async fn list_savings_goals(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<ApiResponse<Vec<SavingsGoal>>>> {
    let goals = state
        .wallet_service
        .list_savings_goals(&user.user_id)
        .await?;
    Ok(success("Savings goals retrieved", goals))
}

async fn create_savings_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(new_goal): ApiJson<NewSavingsGoal>,
) -> ApiResult<Json<ApiResponse<SavingsGoal>>> {
    let goal = state
        .wallet_service
        .create_savings_goal(&user.user_id, new_goal)
        .await?;
    Ok(success("Savings goal created", goal))
}

async fn deposit_to_savings(
    Path(goal_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(request): ApiJson<WalletAmountRequest>,
) -> ApiResult<Json<ApiResponse<SavingsGoal>>> {
    let goal = state
        .wallet_service
        .deposit_to_savings(&user.user_id, &goal_id, request.amount)
        .await?;
    let message = if goal.is_completed {
        "Savings goal reached"
    } else {
        "Savings deposit recorded"
    };
    Ok(success(message, goal))
}

/// The body is optional; an empty body withdraws the goal's full amount.
async fn withdraw_from_savings(
    Path(goal_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<SavingsGoal>>> {
    let request: SavingsWithdrawRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SavingsWithdrawRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let goal = state
        .wallet_service
        .withdraw_from_savings(&user.user_id, &goal_id, request.amount)
        .await?;
    Ok(success("Savings withdrawn", goal))
}

async fn list_goal_allocations(
    Path(goal_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<ApiResponse<Vec<SavingsAllocation>>>> {
    let allocations = state
        .wallet_service
        .list_goal_allocations(&user.user_id, &goal_id)
        .await?;
    Ok(success("Allocations retrieved", allocations))
}

async fn admin_credit(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    ApiJson(request): ApiJson<WalletAmountRequest>,
) -> ApiResult<Json<ApiResponse<Transaction>>> {
    tracing::info!(admin = %admin.user_id, user_id = %user_id, amount = %request.amount, "Admin wallet credit");
    let transaction = state
        .wallet_service
        .credit_wallet(&user_id, request.amount, request.description)
        .await?;
    Ok(success("Wallet credited", transaction))
}

async fn admin_debit(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    ApiJson(request): ApiJson<WalletAmountRequest>,
) -> ApiResult<Json<ApiResponse<Transaction>>> {
    tracing::info!(admin = %admin.user_id, user_id = %user_id, amount = %request.amount, "Admin wallet debit");
    let transaction = state
        .wallet_service
        .debit_wallet(&user_id, request.amount, request.description)
        .await?;
    Ok(success("Wallet debited", transaction))
}

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/wallet", get(get_wallet))
        .route("/wallet/transactions", get(list_transactions))
        .route("/wallet/transactions/{id}", get(get_transaction))
        .route("/wallet/deposit", post(deposit))
        .route("/wallet/transfer", post(transfer))
        .route("/wallet/event-payment", post(pay_for_event))
        .route(
            "/wallet/savings",
            get(list_savings_goals).post(create_savings_goal),
        )
        .route("/wallet/savings/{id}/deposit", post(deposit_to_savings))
        .route("/wallet/savings/{id}/withdraw", post(withdraw_from_savings))
        .route(
            "/wallet/savings/{id}/allocations",
            get(list_goal_allocations),
        )
}

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/wallets/{user_id}/credit", post(admin_credit))
        .route("/wallets/{user_id}/debit", post(admin_debit))
}
