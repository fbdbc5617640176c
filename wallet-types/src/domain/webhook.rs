//! Gateway-facing value types: charge requests, verifications and webhook events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::Currency;

/// Request to open a hosted checkout at the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    /// Minor units
    pub amount: i64,
    pub currency: Currency,
    /// Customer contact the gateway sends receipts to
    pub email: String,
    pub reference: String,
    pub callback_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Gateway acknowledgement of an initialized charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeInitialized {
    pub authorization_url: String,
    pub access_code: String,
    pub provider_reference: String,
}

/// Authoritative charge state as reported by a live gateway query.
#[derive(Debug, Clone)]
pub struct ChargeVerification {
    /// Gateway's textual status (`success`, `failed`, `abandoned`, ...)
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub provider_reference: Option<String>,
    pub channel: Option<String>,
    pub authorization: Option<serde_json::Value>,
}

/// Routing classification of an inbound webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventKind {
    ChargeSucceeded,
    Other(String),
}

/// A parsed, signature-checked webhook.
///
/// Only `reference` is ever acted on; everything else is informational.
#[derive(Debug, Clone)]
pub struct GatewayEvent {
    pub kind: GatewayEventKind,
    pub reference: Option<String>,
    pub data: serde_json::Value,
}
