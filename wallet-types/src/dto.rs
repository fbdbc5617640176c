//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    BalanceSource, Currency, CustomerId, EntryKind, PaymentStatus, PaymentTransaction,
    WalletBalance, WalletEntry,
};

// ─────────────────────────────────────────────────────────────────────────────
// Payment DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to start a payment attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InitializePaymentRequest {
    /// Amount in smallest currency unit (kobo, pesewas, cents)
    #[schema(example = 500000)]
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    pub customer_id: CustomerId,
    /// Customer contact the gateway sends receipts to
    #[schema(example = "ada@example.com")]
    pub email: String,
    /// Caller-chosen idempotency key
    #[schema(example = "topup-2024-0001")]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

fn default_currency() -> Currency {
    Currency::NGN
}

/// Result of initializing (or replaying the initialization of) a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InitializePaymentResponse {
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    pub status: PaymentStatus,
}

impl From<&PaymentTransaction> for InitializePaymentResponse {
    fn from(tx: &PaymentTransaction) -> Self {
        Self {
            reference: tx.reference.clone(),
            authorization_url: tx.checkout.as_ref().map(|c| c.authorization_url.clone()),
            access_code: tx.checkout.as_ref().map(|c| c.access_code.clone()),
            status: tx.status,
        }
    }
}

/// Current reconciled state of a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub reference: String,
    pub status: PaymentStatus,
    #[schema(example = 500000)]
    pub amount: i64,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_reference: Option<String>,
}

impl From<&PaymentTransaction> for VerifyPaymentResponse {
    fn from(tx: &PaymentTransaction) -> Self {
        Self {
            reference: tx.reference.clone(),
            status: tx.status,
            amount: tx.amount.amount(),
            currency: tx.amount.currency(),
            provider_reference: tx.provider_reference.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wallet DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// A verified wallet balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub customer_id: CustomerId,
    #[schema(example = 5000)]
    pub real_balance: i64,
    #[schema(example = 1000)]
    pub promo_balance: i64,
    #[schema(example = 6000)]
    pub total: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<&WalletBalance> for BalanceResponse {
    fn from(b: &WalletBalance) -> Self {
        Self {
            customer_id: b.customer_id,
            real_balance: b.real_balance,
            promo_balance: b.promo_balance,
            total: b.total(),
            updated_at: b.updated_at,
        }
    }
}

/// Request to debit a wallet (e.g. fare settlement).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DebitRequest {
    #[schema(example = 1500)]
    pub amount: i64,
    #[schema(example = "ride-8812")]
    pub reference_id: String,
}

/// Request to refund a previous charge into the real balance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefundRequest {
    #[schema(example = "ride-8812")]
    pub original_reference_id: String,
    #[schema(example = 1500)]
    pub amount: i64,
}

/// Administrative promotional credit.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PromoCreditRequest {
    #[schema(example = 1000)]
    pub amount: i64,
    #[schema(example = "Apology for delayed pickup")]
    pub reason: String,
    #[schema(example = "support-agent-17")]
    pub actor_id: String,
}

/// One ledger entry as exposed to other services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WalletEntryResponse {
    pub id: Uuid,
    pub amount: i64,
    pub kind: EntryKind,
    pub source: BalanceSource,
    pub reference_id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<&WalletEntry> for WalletEntryResponse {
    fn from(e: &WalletEntry) -> Self {
        Self {
            id: e.id,
            amount: e.amount,
            kind: e.kind,
            source: e.source,
            reference_id: e.reference_id.clone(),
            description: e.description.clone(),
            created_at: e.created_at,
        }
    }
}

/// Outcome of a wallet mutation: the new balance and the entry explaining it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PostingResponse {
    pub balance: BalanceResponse,
    pub entry: WalletEntryResponse,
}
