#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::{Path, State},
    http::{header, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use eventhub_core::events::EventQueryLimits;
use eventhub_paychangu::PayChanguConfig;
use eventhub_server::{api::app_router, auth::Role, build_state, config::Config, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    _tmp: TempDir,
}

fn test_config(tmp: &TempDir, paychangu_url: &str) -> Config {
    Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        db_path: tmp.path().join("test.db").to_string_lossy().to_string(),
        cors_allow: vec!["*".to_string()],
        request_timeout: Duration::from_secs(30),
        jwt_secret: vec![42u8; 32],
        token_ttl: Duration::from_secs(3600),
        paychangu: PayChanguConfig {
            base_url: paychangu_url.to_string(),
            secret_key: "sec-test".to_string(),
            callback_url: "http://localhost/api/public/payments/callback".to_string(),
            return_url: "http://localhost/wallet".to_string(),
        },
        catalog_page_size: 100,
        event_limits: EventQueryLimits::default(),
        catalog_sync_interval: Duration::ZERO,
    }
}

impl TestApp {
    pub async fn new() -> Self {
        // Nothing listens on the discard port, so upstream calls fail fast
        Self::with_paychangu_url("http://127.0.0.1:9").await
    }

    pub async fn with_paychangu_url(paychangu_url: &str) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(&tmp, paychangu_url);
        let state = build_state(&config).await.unwrap();
        let router = app_router(state.clone(), &config);
        Self {
            router,
            state,
            _tmp: tmp,
        }
    }

    pub fn token(&self, user_id: &str, role: Role) -> String {
        self.state
            .auth
            .issue_token(user_id, &format!("{user_id}@example.mw"), role)
            .unwrap()
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }
}

/// In-process stand-in for the PayChangu checkout and verification
/// endpoints. Every charge starts out pending until `mark_paid`.
#[derive(Clone, Default)]
pub struct StubGateway {
    charges: Arc<Mutex<HashMap<String, StubCharge>>>,
}

#[derive(Clone)]
struct StubCharge {
    amount: serde_json::Value,
    currency: serde_json::Value,
    status: &'static str,
}

impl StubGateway {
    /// Serves the stub on an ephemeral port and returns it with its base URL.
    pub async fn spawn() -> (Self, String) {
        let stub = Self::default();
        let router = Router::new()
            .route("/payment", post(open_checkout))
            .route("/verify-payment/{tx_ref}", get(verify_payment))
            .with_state(stub.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (stub, format!("http://{addr}"))
    }

    pub fn mark_paid(&self, tx_ref: &str) {
        if let Some(charge) = self.charges.lock().unwrap().get_mut(tx_ref) {
            charge.status = "success";
        }
    }
}

async fn open_checkout(
    State(stub): State<StubGateway>,
    Json(payload): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let tx_ref = payload["tx_ref"].as_str().unwrap_or_default().to_string();
    stub.charges.lock().unwrap().insert(
        tx_ref.clone(),
        StubCharge {
            amount: payload["amount"].clone(),
            currency: payload["currency"].clone(),
            status: "pending",
        },
    );
    Json(serde_json::json!({
        "status": "success",
        "data": { "checkout_url": format!("https://checkout.test/{tx_ref}") }
    }))
}

async fn verify_payment(
    State(stub): State<StubGateway>,
    Path(tx_ref): Path<String>,
) -> Response {
    let charge = stub.charges.lock().unwrap().get(&tx_ref).cloned();
    match charge {
        Some(charge) => Json(serde_json::json!({
            "status": "success",
            "data": {
                "tx_ref": tx_ref,
                "status": charge.status,
                "amount": charge.amount,
                "currency": charge.currency,
            }
        }))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "status": "failed", "message": "Payment not found" })),
        )
            .into_response(),
    }
}
