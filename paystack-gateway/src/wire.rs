//! Paystack JSON wire format.
//!
//! Every response is wrapped in `{ "status": bool, "message": str, "data": ... }`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Error bodies only reliably carry `message`.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct InitializeBody<'a> {
    pub email: &'a str,
    /// Minor units, sent as a string as the API documents
    pub amount: String,
    pub currency: &'a str,
    pub reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct InitializeData {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyData {
    /// Numeric transaction id assigned by Paystack
    pub id: Option<u64>,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub paid_at: Option<String>,
    pub channel: Option<String>,
    pub authorization: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}
