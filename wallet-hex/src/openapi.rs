//! OpenAPI document and Swagger UI wiring.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use wallet_types::domain::{BalanceSource, Currency, CustomerId, EntryKind, PaymentStatus};
use wallet_types::dto::{
    BalanceResponse, DebitRequest, InitializePaymentRequest, InitializePaymentResponse,
    PostingResponse, PromoCreditRequest, RefundRequest, VerifyPaymentResponse,
    WalletEntryResponse,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Start or replay a payment attempt
#[utoipa::path(
    post,
    path = "/api/payments/initialize",
    tag = "payments",
    request_body = InitializePaymentRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Checkout opened, or settled payment replayed", body = InitializePaymentResponse),
        (status = 400, description = "Invalid request"),
        (status = 402, description = "Gateway declined the charge"),
        (status = 409, description = "Reference already used for a different payment"),
        (status = 503, description = "Gateway unavailable; retry with backoff")
    )
)]
async fn initialize_payment() {}

/// Reconcile a payment with the gateway
#[utoipa::path(
    get,
    path = "/api/payments/{reference}/verify",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(("reference" = String, Path, description = "Payment reference")),
    responses(
        (status = 200, description = "Current reconciled state", body = VerifyPaymentResponse),
        (status = 404, description = "Unknown reference"),
        (status = 409, description = "Gateway amount mismatch"),
        (status = 503, description = "Gateway unavailable; status unchanged")
    )
)]
async fn verify_payment() {}

/// Gateway webhook
#[utoipa::path(
    post,
    path = "/api/webhooks/paystack",
    tag = "webhooks",
    request_body(content = inline(serde_json::Value), description = "Raw signed event body"),
    params(("x-paystack-signature" = String, Header, description = "HMAC-SHA512 of the raw body")),
    responses(
        (status = 204, description = "Event processed or ignored"),
        (status = 400, description = "Malformed payload"),
        (status = 401, description = "Invalid signature"),
        (status = 503, description = "Gateway unavailable; redeliver later")
    )
)]
async fn paystack_webhook() {}

/// Get a customer's verified balance
#[utoipa::path(
    get,
    path = "/api/wallets/{id}",
    tag = "wallets",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Customer ID (UUID)")),
    responses(
        (status = 200, description = "Balance", body = BalanceResponse),
        (status = 423, description = "Wallet frozen after an integrity violation")
    )
)]
async fn get_balance() {}

/// List ledger entries, newest first
#[utoipa::path(
    get,
    path = "/api/wallets/{id}/entries",
    tag = "wallets",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Customer ID (UUID)"),
        ("limit" = Option<i64>, Query, description = "Maximum entries (default 50)")
    ),
    responses(
        (status = 200, description = "Entries", body = Vec<WalletEntryResponse>),
        (status = 423, description = "Wallet frozen after an integrity violation")
    )
)]
async fn list_entries() {}

/// Debit a wallet, promo funds first
#[utoipa::path(
    post,
    path = "/api/wallets/{id}/debit",
    tag = "wallets",
    request_body = DebitRequest,
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Customer ID (UUID)")),
    responses(
        (status = 200, description = "Debited", body = PostingResponse),
        (status = 409, description = "Reference already applied"),
        (status = 422, description = "Insufficient funds"),
        (status = 423, description = "Wallet frozen")
    )
)]
async fn debit() {}

/// Refund into the real balance
#[utoipa::path(
    post,
    path = "/api/wallets/{id}/refund",
    tag = "wallets",
    request_body = RefundRequest,
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Customer ID (UUID)")),
    responses(
        (status = 201, description = "Refunded", body = PostingResponse),
        (status = 423, description = "Wallet frozen")
    )
)]
async fn refund() {}

/// Administrative promo credit
#[utoipa::path(
    post,
    path = "/api/wallets/{id}/promo",
    tag = "wallets",
    request_body = PromoCreditRequest,
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Customer ID (UUID)")),
    responses(
        (status = 201, description = "Credited", body = PostingResponse),
        (status = 409, description = "Same promo already granted in this window"),
        (status = 423, description = "Wallet frozen")
    )
)]
async fn credit_promo() {}

/// OpenAPI documentation for the wallet API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payment Reconciliation & Wallet Ledger API",
        version = "1.0.0",
        description = "Payment initialization and verification against the gateway, plus a signed dual-balance customer wallet.\n\n## Authentication\n\nPayment and wallet endpoints require the service token:\n\n```\nAuthorization: Bearer <SERVICE_API_TOKEN>\n```\n\nThe webhook endpoint is authenticated by the gateway signature header.",
        license(name = "MIT"),
    ),
    paths(
        health,
        initialize_payment,
        verify_payment,
        paystack_webhook,
        get_balance,
        list_entries,
        debit,
        refund,
        credit_promo,
    ),
    components(
        schemas(
            InitializePaymentRequest,
            InitializePaymentResponse,
            VerifyPaymentResponse,
            BalanceResponse,
            DebitRequest,
            RefundRequest,
            PromoCreditRequest,
            PostingResponse,
            WalletEntryResponse,
            PaymentStatus,
            EntryKind,
            BalanceSource,
            Currency,
            CustomerId,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "payments", description = "Payment initialization and verification"),
        (name = "webhooks", description = "Gateway callbacks"),
        (name = "wallets", description = "Balances, debits, refunds and promo credits"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for Bearer token authentication.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();
        assert!(paths.contains(&"/api/payments/initialize".to_string()));
        assert!(paths.contains(&"/api/wallets/{id}/debit".to_string()));
        assert!(paths.contains(&"/api/webhooks/paystack".to_string()));
    }
}
