//! # Paystack Gateway
//!
//! Adapter implementing the `PaymentGateway` port against the Paystack API.
//!
//! - `POST /transaction/initialize` opens a hosted checkout
//! - `GET /transaction/verify/{reference}` reports the authoritative charge state
//! - Webhooks are signed with HMAC-SHA512 over the raw body, keyed with the
//!   secret key, and delivered in the `x-paystack-signature` header
//!
//! The adapter holds no business logic. It never decides whether money moved;
//! it only reports what Paystack says.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use sha2::Sha512;

use wallet_types::{
    ChargeInitialized, ChargeRequest, ChargeVerification, GatewayError, GatewayEvent,
    GatewayEventKind, PaymentGateway,
};

mod wire;

use wire::{Envelope, ErrorBody, InitializeBody, InitializeData, VerifyData, WebhookBody};

type HmacSha512 = Hmac<Sha512>;

pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";
pub const CHARGE_SUCCESS_EVENT: &str = "charge.success";

/// Connection settings for the Paystack API.
#[derive(Clone)]
pub struct PaystackConfig {
    pub secret_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for PaystackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl PaystackConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Paystack API client.
pub struct PaystackClient {
    config: PaystackConfig,
    http: Client,
}

impl PaystackClient {
    /// Creates a new client with a bounded per-request timeout.
    pub fn new(config: PaystackConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Decodes an enveloped response, classifying failures as retryable or not.
    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, GatewayError> {
        let status = resp.status();
        let body = resp.bytes().await.map_err(transport_error)?;

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::Unavailable(format!("HTTP {}", status)));
        }

        if status.is_client_error() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or_default();
            return Err(GatewayError::Rejected(format!("HTTP {}: {}", status, message)));
        }

        // A 2xx we cannot read may still hide a completed charge; treat as transient.
        let envelope: Envelope<T> = serde_json::from_slice(&body)
            .map_err(|e| GatewayError::Unavailable(format!("Unreadable gateway response: {}", e)))?;

        if !envelope.status {
            return Err(GatewayError::Rejected(envelope.message));
        }

        envelope
            .data
            .ok_or_else(|| GatewayError::Unavailable("Gateway response missing data".into()))
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Unavailable("Gateway request timed out".into())
    } else {
        GatewayError::Unavailable(e.to_string())
    }
}

/// Computes the hex HMAC-SHA512 Paystack attaches to a webhook body.
pub fn sign_webhook(payload: &[u8], secret_key: &str) -> String {
    let mut mac =
        HmacSha512::new_from_slice(secret_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a webhook signature over the exact raw bytes, in constant time.
pub fn verify_webhook_signature(payload: &[u8], signature: &str, secret_key: &str) -> bool {
    let Ok(provided) = hex::decode(signature.trim()) else {
        return false;
    };
    let mut mac =
        HmacSha512::new_from_slice(secret_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.verify_slice(&provided).is_ok()
}

fn parse_paid_at(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    fn provider(&self) -> &'static str {
        "paystack"
    }

    fn signature_header(&self) -> &'static str {
        SIGNATURE_HEADER
    }

    #[tracing::instrument(skip(self, req), fields(reference = %req.reference, amount = req.amount))]
    async fn initialize(&self, req: ChargeRequest) -> Result<ChargeInitialized, GatewayError> {
        let currency = req.currency.to_string();
        let body = InitializeBody {
            email: &req.email,
            amount: req.amount.to_string(),
            currency: &currency,
            reference: &req.reference,
            callback_url: req.callback_url.as_deref(),
            metadata: req.metadata.as_ref(),
        };

        let resp = self
            .http
            .post(self.url("/transaction/initialize"))
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let data: InitializeData = Self::decode(resp).await?;
        tracing::debug!("Paystack accepted charge initialization");

        Ok(ChargeInitialized {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            provider_reference: data.reference,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn verify(&self, reference: &str) -> Result<ChargeVerification, GatewayError> {
        let resp = self
            .http
            .get(self.url(&format!("/transaction/verify/{}", reference)))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(transport_error)?;

        let data: VerifyData = Self::decode(resp).await?;
        tracing::debug!(gateway_status = %data.status, "Paystack verification received");

        Ok(ChargeVerification {
            paid_at: parse_paid_at(data.paid_at.as_deref()),
            status: data.status,
            amount: data.amount,
            currency: data.currency,
            provider_reference: data.id.map(|id| id.to_string()),
            channel: data.channel,
            authorization: data.authorization,
        })
    }

    fn validate_webhook_signature(
        &self,
        raw_payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<(), GatewayError> {
        match signature_header {
            Some(sig) if verify_webhook_signature(raw_payload, sig, &self.config.secret_key) => {
                Ok(())
            }
            _ => Err(GatewayError::InvalidSignature),
        }
    }

    fn parse_webhook_event(&self, raw_payload: &[u8]) -> Result<GatewayEvent, GatewayError> {
        let body: WebhookBody = serde_json::from_slice(raw_payload)
            .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;

        let reference = body
            .data
            .get("reference")
            .and_then(|r| r.as_str())
            .map(str::to_string);

        let kind = if body.event == CHARGE_SUCCESS_EVENT {
            GatewayEventKind::ChargeSucceeded
        } else {
            GatewayEventKind::Other(body.event)
        };

        Ok(GatewayEvent {
            kind,
            reference,
            data: body.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "sk_test_3f9a1c";

    fn client() -> PaystackClient {
        PaystackClient::new(PaystackConfig::new(SECRET)).unwrap()
    }

    #[test]
    fn test_signature_roundtrip() {
        let payload = br#"{"event":"charge.success","data":{"reference":"ref-1"}}"#;
        let signature = sign_webhook(payload, SECRET);

        assert_eq!(signature.len(), 128);
        assert!(verify_webhook_signature(payload, &signature, SECRET));
        assert!(verify_webhook_signature(
            payload,
            &signature.to_uppercase(),
            SECRET
        ));
        assert!(!verify_webhook_signature(payload, &signature, "sk_other"));
        assert!(!verify_webhook_signature(b"tampered", &signature, SECRET));
    }

    #[test]
    fn test_signature_covers_exact_bytes() {
        let compact = br#"{"event":"charge.success","data":{"reference":"ref-1"}}"#;
        let pretty = br#"{ "event": "charge.success", "data": { "reference": "ref-1" } }"#;
        let signature = sign_webhook(compact, SECRET);
        assert!(!verify_webhook_signature(pretty, &signature, SECRET));
    }

    #[test]
    fn test_validate_rejects_missing_and_garbage() {
        let client = client();
        let payload = b"{}";
        assert!(matches!(
            client.validate_webhook_signature(payload, None),
            Err(GatewayError::InvalidSignature)
        ));
        assert!(matches!(
            client.validate_webhook_signature(payload, Some("not-hex")),
            Err(GatewayError::InvalidSignature)
        ));
        assert!(matches!(
            client.validate_webhook_signature(payload, Some("")),
            Err(GatewayError::InvalidSignature)
        ));
        let good = sign_webhook(payload, SECRET);
        assert!(client.validate_webhook_signature(payload, Some(&good)).is_ok());
    }

    #[test]
    fn test_parse_charge_success() {
        let event = client()
            .parse_webhook_event(
                br#"{"event":"charge.success","data":{"reference":"ref-9","amount":999999}}"#,
            )
            .unwrap();
        assert_eq!(event.kind, GatewayEventKind::ChargeSucceeded);
        assert_eq!(event.reference.as_deref(), Some("ref-9"));
    }

    #[test]
    fn test_parse_other_event() {
        let event = client()
            .parse_webhook_event(br#"{"event":"transfer.success","data":{}}"#)
            .unwrap();
        assert_eq!(
            event.kind,
            GatewayEventKind::Other("transfer.success".into())
        );
        assert!(event.reference.is_none());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            client().parse_webhook_event(b"not json"),
            Err(GatewayError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_paid_at_parsing() {
        assert!(parse_paid_at(Some("2024-03-01T10:15:00.000Z")).is_some());
        assert!(parse_paid_at(Some("yesterday")).is_none());
        assert!(parse_paid_at(None).is_none());
    }
}
