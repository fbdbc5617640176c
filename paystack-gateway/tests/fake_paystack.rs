//! Exercises the reqwest adapter against an in-process fake Paystack API.

use std::time::Duration;

use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};

use paystack_gateway::{PaystackClient, PaystackConfig};
use wallet_types::{ChargeRequest, Currency, GatewayError, PaymentGateway};

const SECRET: &str = "sk_test_fake_paystack";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", SECRET))
        .unwrap_or(false)
}

async fn initialize(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": false, "message": "Invalid key"})),
        );
    }
    if body["reference"] == "duplicate" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": false, "message": "Duplicate Transaction Reference"})),
        );
    }
    assert_eq!(body["amount"], "500000");
    assert_eq!(body["currency"], "NGN");
    (
        StatusCode::OK,
        Json(json!({
            "status": true,
            "message": "Authorization URL created",
            "data": {
                "authorization_url": "https://checkout.paystack.com/0peioxfhpn",
                "access_code": "0peioxfhpn",
                "reference": body["reference"],
            }
        })),
    )
}

async fn verify(Path(reference): Path<String>) -> impl IntoResponse {
    match reference.as_str() {
        "boom" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status": false, "message": "upstream"})),
        ),
        "unknown" => (
            StatusCode::NOT_FOUND,
            Json(json!({"status": false, "message": "Transaction reference not found"})),
        ),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            (StatusCode::OK, Json(json!({"status": true, "data": null})))
        }
        _ => (
            StatusCode::OK,
            Json(json!({
                "status": true,
                "message": "Verification successful",
                "data": {
                    "id": 4099260516u64,
                    "status": "success",
                    "reference": reference,
                    "amount": 500000,
                    "currency": "NGN",
                    "paid_at": "2024-08-22T09:15:02.000Z",
                    "channel": "card",
                    "authorization": {"last4": "4081", "reusable": true}
                }
            })),
        ),
    }
}

async fn spawn_fake() -> String {
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

async fn client(timeout: Duration) -> PaystackClient {
    let base = spawn_fake().await;
    PaystackClient::new(
        PaystackConfig::new(SECRET)
            .with_base_url(base)
            .with_timeout(timeout),
    )
    .unwrap()
}

fn charge(reference: &str) -> ChargeRequest {
    ChargeRequest {
        amount: 500_000,
        currency: Currency::NGN,
        email: "ada@example.com".into(),
        reference: reference.into(),
        callback_url: None,
        metadata: Some(json!({"customer_id": "c-1"})),
    }
}

#[tokio::test]
async fn initialize_returns_checkout() {
    let client = client(Duration::from_secs(5)).await;
    let init = client.initialize(charge("ref-100")).await.unwrap();
    assert_eq!(init.access_code, "0peioxfhpn");
    assert_eq!(init.provider_reference, "ref-100");
    assert!(init.authorization_url.starts_with("https://checkout.paystack.com/"));
}

#[tokio::test]
async fn initialize_business_error_is_rejected() {
    let client = client(Duration::from_secs(5)).await;
    let err = client.initialize(charge("duplicate")).await.unwrap_err();
    match err {
        GatewayError::Rejected(msg) => assert!(msg.contains("Duplicate")),
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn wrong_key_is_rejected() {
    let base = spawn_fake().await;
    let client =
        PaystackClient::new(PaystackConfig::new("sk_wrong").with_base_url(base)).unwrap();
    let err = client.initialize(charge("ref-1")).await.unwrap_err();
    assert!(matches!(err, GatewayError::Rejected(_)));
}

#[tokio::test]
async fn verify_reports_gateway_state() {
    let client = client(Duration::from_secs(5)).await;
    let v = client.verify("ref-100").await.unwrap();
    assert_eq!(v.status, "success");
    assert_eq!(v.amount, 500_000);
    assert_eq!(v.currency, "NGN");
    assert_eq!(v.provider_reference.as_deref(), Some("4099260516"));
    assert_eq!(v.channel.as_deref(), Some("card"));
    assert!(v.paid_at.is_some());
}

#[tokio::test]
async fn server_error_is_unavailable() {
    let client = client(Duration::from_secs(5)).await;
    let err = client.verify("boom").await.unwrap_err();
    assert!(matches!(err, GatewayError::Unavailable(_)));
}

#[tokio::test]
async fn not_found_is_rejected() {
    let client = client(Duration::from_secs(5)).await;
    let err = client.verify("unknown").await.unwrap_err();
    assert!(matches!(err, GatewayError::Rejected(_)));
}

#[tokio::test]
async fn timeout_is_unavailable() {
    let client = client(Duration::from_millis(200)).await;
    let err = client.verify("slow").await.unwrap_err();
    assert!(matches!(err, GatewayError::Unavailable(_)));
}
