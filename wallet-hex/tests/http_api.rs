//! HTTP-level tests for the wallet API.
//!
//! Runs the real router over an in-memory SQLite store and the Paystack
//! adapter pointed at an in-process fake gateway.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::Path,
    http::{Method, Request, StatusCode},
    routing::{get, post},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use paystack_gateway::{PaystackClient, PaystackConfig, SIGNATURE_HEADER, sign_webhook};
use wallet_hex::{EngineConfig, ReconciliationEngine, WalletLedger, inbound::HttpServer};
use wallet_repo::{IntegritySigner, SqliteStore};
use wallet_types::CustomerId;

const PAYSTACK_SECRET: &str = "sk_test_http_api";
const LEDGER_SECRET: &str = "http-api-ledger-secret-0123456789abcdef";
const API_TOKEN: &str = "svc_test_token";

struct TestApp {
    router: Router,
    store: Arc<SqliteStore>,
}

/// Fake Paystack: every charge of 500000 NGN succeeds.
async fn spawn_fake_paystack() -> String {
    async fn initialize(Json(body): Json<Value>) -> Json<Value> {
        let reference = body["reference"].as_str().unwrap_or_default().to_string();
        Json(json!({
            "status": true,
            "message": "Authorization URL created",
            "data": {
                "authorization_url": format!("https://checkout.paystack.com/{}", reference),
                "access_code": format!("ac_{}", reference),
                "reference": reference,
            }
        }))
    }

    async fn verify(Path(reference): Path<String>) -> Json<Value> {
        Json(json!({
            "status": true,
            "message": "Verification successful",
            "data": {
                "id": 777,
                "status": "success",
                "reference": reference,
                "amount": 500000,
                "currency": "NGN",
                "paid_at": "2024-08-22T09:15:02.000Z",
                "channel": "card"
            }
        }))
    }

    let app = Router::new()
        .route("/transaction/initialize", post(initialize))
        .route("/transaction/verify/{reference}", get(verify));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn test_app() -> TestApp {
    let base_url = spawn_fake_paystack().await;
    let store = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
    let gateway = Arc::new(
        PaystackClient::new(
            PaystackConfig::new(PAYSTACK_SECRET)
                .with_base_url(base_url)
                .with_timeout(Duration::from_secs(5)),
        )
        .unwrap(),
    );
    let signer = Arc::new(IntegritySigner::new(LEDGER_SECRET).unwrap());
    let ledger = Arc::new(WalletLedger::new(store.clone(), signer));
    let engine = Arc::new(ReconciliationEngine::new(
        store.clone(),
        gateway,
        ledger,
        EngineConfig::default(),
    ));
    let server = HttpServer::new(engine, API_TOKEN);
    TestApp {
        router: server.router(),
        store,
    }
}

fn authed(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", API_TOKEN));
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn webhook(body: &[u8], signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/webhooks/paystack")
        .header("Content-Type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header(SIGNATURE_HEADER, sig);
    }
    builder.body(Body::from(body.to_vec())).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn initialize_body(reference: &str, customer: CustomerId) -> Value {
    json!({
        "amount": 500000,
        "currency": "NGN",
        "customer_id": customer,
        "email": "ada@example.com",
        "reference": reference,
    })
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_wallet_routes_require_token() {
    let app = test_app().await;
    let uri = format!("/api/wallets/{}", CustomerId::new());

    let request = Request::builder().uri(&uri).body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["retryable"], false);

    let request = Request::builder()
        .uri(&uri)
        .header("Authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_payment_flow_credits_wallet_once() {
    let app = test_app().await;
    let customer = CustomerId::new();

    let (status, body) = send(
        &app,
        authed(
            Method::POST,
            "/api/payments/initialize",
            Some(initialize_body("topup-1", customer)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PROCESSING");
    assert_eq!(body["access_code"], "ac_topup-1");

    for _ in 0..2 {
        let (status, body) = send(
            &app,
            authed(Method::GET, "/api/payments/topup-1/verify", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "SUCCESS");
        assert_eq!(body["provider_reference"], "777");
    }

    let (status, body) = send(
        &app,
        authed(Method::GET, &format!("/api/wallets/{}", customer), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["real_balance"], 500000);
    assert_eq!(body["total"], 500000);

    let (status, body) = send(
        &app,
        authed(
            Method::GET,
            &format!("/api/wallets/{}/entries", customer),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["reference_id"], "topup-1");
}

#[tokio::test]
async fn test_unknown_payment_is_404() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        authed(Method::GET, "/api/payments/nope/verify", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn test_debit_refund_and_promo() {
    let app = test_app().await;
    let customer = CustomerId::new();
    let base = format!("/api/wallets/{}", customer);

    let (status, body) = send(
        &app,
        authed(
            Method::POST,
            &format!("{}/promo", base),
            Some(json!({"amount": 30, "reason": "Goodwill", "actor_id": "agent-1"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["balance"]["promo_balance"], 30);

    let (status, _) = send(
        &app,
        authed(
            Method::POST,
            &format!("{}/refund", base),
            Some(json!({"original_reference_id": "REF-1", "amount": 50})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        authed(
            Method::POST,
            &format!("{}/debit", base),
            Some(json!({"amount": 40, "reference_id": "ride-1"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"]["promo_balance"], 0);
    assert_eq!(body["balance"]["real_balance"], 40);
    assert_eq!(body["entry"]["source"], "SPLIT");
    assert_eq!(body["entry"]["amount"], -40);

    let (status, body) = send(
        &app,
        authed(
            Method::POST,
            &format!("{}/debit", base),
            Some(json!({"amount": 41, "reference_id": "ride-2"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["retryable"], false);

    let (status, _) = send(
        &app,
        authed(
            Method::POST,
            &format!("{}/debit", base),
            Some(json!({"amount": 5, "reference_id": "ride-1"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_tampered_balance_is_frozen() {
    let app = test_app().await;
    let customer = CustomerId::new();
    let base = format!("/api/wallets/{}", customer);

    let (status, _) = send(
        &app,
        authed(
            Method::POST,
            &format!("{}/refund", base),
            Some(json!({"original_reference_id": "REF-9", "amount": 100})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    sqlx::query("UPDATE wallet_balances SET real_balance = 1000000 WHERE customer_id = ?")
        .bind(customer.to_string())
        .execute(app.store.pool())
        .await
        .unwrap();

    let (status, _) = send(&app, authed(Method::GET, &base, None)).await;
    assert_eq!(status, StatusCode::LOCKED);

    let (status, _) = send(
        &app,
        authed(
            Method::POST,
            &format!("{}/debit", base),
            Some(json!({"amount": 10, "reference_id": "ride-1"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::LOCKED);
}

#[tokio::test]
async fn test_webhook_signature_enforced() {
    let app = test_app().await;
    let customer = CustomerId::new();
    send(
        &app,
        authed(
            Method::POST,
            "/api/payments/initialize",
            Some(initialize_body("topup-2", customer)),
        ),
    )
    .await;

    let payload = br#"{"event":"charge.success","data":{"reference":"topup-2","amount":999999999}}"#;

    let (status, _) = send(&app, webhook(payload, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = sign_webhook(payload, "sk_attacker");
    let (status, _) = send(&app, webhook(payload, Some(forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Nothing moved.
    let (_, body) = send(
        &app,
        authed(Method::GET, &format!("/api/wallets/{}", customer), None),
    )
    .await;
    assert_eq!(body["real_balance"], 0);

    let signed = sign_webhook(payload, PAYSTACK_SECRET);
    let (status, _) = send(&app, webhook(payload, Some(signed))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(
        &app,
        authed(Method::GET, &format!("/api/wallets/{}", customer), None),
    )
    .await;
    assert_eq!(body["real_balance"], 500000);
}

#[tokio::test]
async fn test_webhook_ignored_events_acknowledged() {
    let app = test_app().await;

    let other = br#"{"event":"transfer.success","data":{"reference":"t-1"}}"#;
    let (status, _) = send(
        &app,
        webhook(other, Some(sign_webhook(other, PAYSTACK_SECRET))),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let unknown = br#"{"event":"charge.success","data":{"reference":"never-seen"}}"#;
    let (status, _) = send(
        &app,
        webhook(unknown, Some(sign_webhook(unknown, PAYSTACK_SECRET))),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let malformed = b"{not json";
    let (status, _) = send(
        &app,
        webhook(malformed, Some(sign_webhook(malformed, PAYSTACK_SECRET))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
