mod common;

use axum::http::{Method, StatusCode};
use common::{StubGateway, TestApp};
use eventhub_server::auth::Role;
use serde_json::json;

async fn credit(app: &TestApp, user_id: &str, amount: f64) {
    let admin = app.token("root", Role::Admin);
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/admin/wallets/{user_id}/credit"),
            Some(&admin),
            Some(json!({ "amount": amount, "description": "Top up" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

async fn regular_balance(app: &TestApp, token: &str) -> f64 {
    let (status, body) = app
        .send(Method::GET, "/api/user/wallet", Some(token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["regularBalance"].as_f64().unwrap()
}

#[tokio::test]
async fn admin_credit_then_overdraft_debit_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.token("root", Role::Admin);
    let alice = app.token("alice", Role::User);

    credit(&app, "alice", 100.0).await;
    assert_eq!(regular_balance(&app, &alice).await, 100.0);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/admin/wallets/alice/debit",
            Some(&admin),
            Some(json!({ "amount": 150 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Insufficient balance"));
    assert_eq!(regular_balance(&app, &alice).await, 100.0);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/admin/wallets/alice/debit",
            Some(&admin),
            Some(json!({ "amount": 40 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(regular_balance(&app, &alice).await, 60.0);

    let (status, body) = app
        .send(
            Method::GET,
            "/api/user/wallet/transactions?kind=withdrawal",
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["transactions"][0]["direction"], "debit");
}

#[tokio::test]
async fn transfer_moves_money_between_users() {
    let app = TestApp::new().await;
    let alice = app.token("alice", Role::User);
    let bob = app.token("bob", Role::User);
    credit(&app, "alice", 100.0).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/user/wallet/transfer",
            Some(&alice),
            Some(json!({ "toUserId": "bob", "amount": 30 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["outgoing"]["counterpartyUserId"], "bob");

    assert_eq!(regular_balance(&app, &alice).await, 70.0);
    assert_eq!(regular_balance(&app, &bob).await, 30.0);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/user/wallet/transfer",
            Some(&alice),
            Some(json!({ "toUserId": "alice", "amount": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn transactions_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let alice = app.token("alice", Role::User);
    let mallory = app.token("mallory", Role::User);
    credit(&app, "alice", 20.0).await;

    let (_, body) = app
        .send(Method::GET, "/api/user/wallet/transactions", Some(&alice), None)
        .await;
    let id = body["data"]["transactions"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, _) = app
        .send(
            Method::GET,
            &format!("/api/user/wallet/transactions/{id}"),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            Method::GET,
            &format!("/api/user/wallet/transactions/{id}"),
            Some(&mallory),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::GET,
            "/api/user/wallet/transactions/missing",
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn savings_goal_fills_then_withdraws_in_full() {
    let app = TestApp::new().await;
    let alice = app.token("alice", Role::User);
    credit(&app, "alice", 100.0).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/user/wallet/savings",
            Some(&alice),
            Some(json!({ "name": "Festival", "targetAmount": 50 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let goal_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/user/wallet/savings/{goal_id}/withdraw"),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/user/wallet/savings/{goal_id}/deposit"),
            Some(&alice),
            Some(json!({ "amount": 50 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isCompleted"], true);
    assert_eq!(regular_balance(&app, &alice).await, 50.0);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/user/wallet/savings/{goal_id}/withdraw"),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["currentAmount"].as_f64().unwrap(), 0.0);
    assert_eq!(regular_balance(&app, &alice).await, 100.0);

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/api/user/wallet/savings/{goal_id}/allocations"),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn deposit_marks_transaction_failed_when_gateway_is_down() {
    let app = TestApp::new().await;
    let alice = app.token("alice", Role::User);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/user/wallet/deposit",
            Some(&alice),
            Some(json!({ "amount": 25 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, body) = app
        .send(Method::GET, "/api/user/wallet/transactions", Some(&alice), None)
        .await;
    assert_eq!(body["data"]["transactions"][0]["status"], "failed");
    assert_eq!(regular_balance(&app, &alice).await, 0.0);
}

#[tokio::test]
async fn callback_for_unknown_reference_is_not_found() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/public/payments/callback",
            None,
            Some(json!({ "tx_ref": "EH-missing", "status": "success" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    let (status, _) = app
        .send(
            Method::GET,
            "/api/public/payments/callback?tx_ref=EH-missing&status=bogus",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forged_success_callback_does_not_credit_the_wallet() {
    let (gateway, base_url) = StubGateway::spawn().await;
    let app = TestApp::with_paychangu_url(&base_url).await;
    let alice = app.token("alice", Role::User);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/user/wallet/deposit",
            Some(&alice),
            Some(json!({ "amount": 1000000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let tx_ref = body["data"]["txRef"].as_str().unwrap().to_string();

    // The charge is still pending upstream, whatever the caller claims
    let callback = format!("/api/public/payments/callback?tx_ref={tx_ref}&status=success");
    let (status, body) = app.send(Method::GET, &callback, None, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_ne!(body["data"]["transaction"]["status"], "completed");
    assert_eq!(regular_balance(&app, &alice).await, 0.0);

    gateway.mark_paid(&tx_ref);
    let (status, body) = app.send(Method::GET, &callback, None, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["transaction"]["status"], "completed");
    assert_eq!(body["data"]["applied"], true);
    assert_eq!(regular_balance(&app, &alice).await, 1000000.0);

    // Replays are no-ops once settled
    let (_, body) = app.send(Method::GET, &callback, None, None).await;
    assert_eq!(body["data"]["applied"], false);
    assert_eq!(regular_balance(&app, &alice).await, 1000000.0);
}

#[tokio::test]
async fn malformed_json_body_uses_the_error_envelope() {
    let app = TestApp::new().await;
    let alice = app.token("alice", Role::User);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/user/wallet/transfer",
            Some(&alice),
            Some(json!({ "amount": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], 400);
}
