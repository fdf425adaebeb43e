use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    middleware,
    routing::get,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    auth::{self, require_auth, require_scope, Scope},
    config::Config,
    error::ApiError,
    main_lib::AppState,
};

mod categories;
mod events;
mod payments;
mod tickets;
mod wallet;

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub message: String,
    pub data: T,
}

pub fn success<T: Serialize>(message: impl Into<String>, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        status: "success",
        message: message.into(),
        data,
    })
}

/// JSON body extractor whose rejections use the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections use the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

pub async fn healthz() -> &'static str {
    "ok"
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_allow.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let origins = config
        .cors_allow
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect::<Vec<_>>();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let public = Router::new()
        .merge(events::public_router())
        .merge(categories::public_router())
        .merge(payments::router());

    let user = Router::new()
        .route("/auth/logout", post(auth::logout))
        .merge(wallet::user_router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let admin = Router::new()
        .merge(events::admin_router())
        .merge(categories::admin_router())
        .merge(wallet::admin_router())
        .route_layer(middleware::from_fn_with_state(Scope::Admin, require_scope))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let organizer = tickets::router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_auth,
    ));

    Router::new()
        .route("/api/v1/healthz", get(healthz))
        .nest("/api/public", public)
        .nest("/api/user", user)
        .nest("/api/admin", admin)
        .nest("/api/organizer", organizer)
        .with_state(state)
        .layer(cors_layer(config))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}
