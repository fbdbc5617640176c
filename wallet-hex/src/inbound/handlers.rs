//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use wallet_types::{
    AppError, BalanceResponse, CustomerId, DebitRequest, InitializePaymentRequest,
    InitializePaymentResponse, LedgerError, PaymentGateway, PaymentStore, PostingResponse,
    PromoCreditRequest, RefundRequest, VerifyPaymentResponse, WalletEntryResponse, WalletStore,
};

use crate::ledger::Posting;
use crate::webhook::{WebhookIngestion, WebhookOutcome};
use crate::ReconciliationEngine;

/// Application state shared across handlers.
pub struct AppState<S, G>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    pub engine: Arc<ReconciliationEngine<S, G>>,
    pub webhooks: WebhookIngestion<S, G>,
    /// Service-to-service bearer token
    pub api_token: String,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError(err.into())
    }
}

fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        AppError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::AccountFrozen(_) => StatusCode::LOCKED,
        AppError::GatewayRejected(_) => StatusCode::PAYMENT_REQUIRED,
        AppError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = match &self.0 {
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16(),
            "retryable": self.0.is_retryable(),
        });

        (status, Json(body)).into_response()
    }
}

fn parse_customer(id: &str) -> Result<CustomerId, AppError> {
    id.parse()
        .map_err(|_| AppError::BadRequest("Invalid customer ID".into()))
}

fn posting_response(p: &Posting) -> PostingResponse {
    PostingResponse {
        balance: BalanceResponse::from(&p.balance),
        entry: WalletEntryResponse::from(&p.entry),
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Payments
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, req), fields(reference = %req.reference))]
pub async fn initialize_payment<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(req): Json<InitializePaymentRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    let tx = state.engine.initialize(req).await?;
    Ok(Json(InitializePaymentResponse::from(&tx)))
}

#[tracing::instrument(skip(state))]
pub async fn verify_payment<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    let tx = state.engine.verify(&reference).await?;
    Ok(Json(VerifyPaymentResponse::from(&tx)))
}

/// Gateway callback. Authenticated by its signature over the raw body.
pub async fn paystack_webhook<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    let signature = headers
        .get(state.webhooks.signature_header())
        .and_then(|v| v.to_str().ok());

    match state.webhooks.handle(&body, signature).await? {
        WebhookOutcome::Processed(tx) => {
            tracing::info!(reference = %tx.reference, status = %tx.status, "Webhook processed");
        }
        WebhookOutcome::Ignored(reason) => {
            tracing::debug!(reason = %reason, "Webhook acknowledged");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

// ─────────────────────────────────────────────────────────────────────────────
// Wallets
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state), fields(customer_id = %id))]
pub async fn get_balance<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    let customer = parse_customer(&id)?;
    let balance = state.engine.ledger().get_balance(customer).await?;
    Ok(Json(BalanceResponse::from(&balance)))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

#[tracing::instrument(skip(state, params), fields(customer_id = %id))]
pub async fn list_entries<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ApiError>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    let customer = parse_customer(&id)?;
    let entries = state
        .engine
        .ledger()
        .history(customer, params.limit.unwrap_or(50))
        .await?;
    let response: Vec<WalletEntryResponse> = entries.iter().map(Into::into).collect();
    Ok(Json(response))
}

#[tracing::instrument(skip(state, req), fields(customer_id = %id, amount = req.amount))]
pub async fn debit<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Json(req): Json<DebitRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    let customer = parse_customer(&id)?;
    let posting = state
        .engine
        .ledger()
        .debit(customer, req.amount, &req.reference_id)
        .await?;
    Ok(Json(posting_response(&posting)))
}

#[tracing::instrument(skip(state, req), fields(customer_id = %id, amount = req.amount))]
pub async fn refund<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Json(req): Json<RefundRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    let customer = parse_customer(&id)?;
    let posting = state
        .engine
        .ledger()
        .refund(customer, &req.original_reference_id, req.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(posting_response(&posting))))
}

#[tracing::instrument(skip(state, req), fields(customer_id = %id, actor_id = %req.actor_id))]
pub async fn credit_promo<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Json(req): Json<PromoCreditRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    let customer = parse_customer(&id)?;
    let posting = state
        .engine
        .ledger()
        .credit_promo(customer, req.amount, &req.reason, &req.actor_id)
        .await?;
    Ok((StatusCode::CREATED, Json(posting_response(&posting))))
}
