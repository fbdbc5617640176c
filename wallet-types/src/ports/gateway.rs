//! Payment gateway port.
//!
//! Abstracts the external payment provider. Implementations carry no
//! business logic: they translate requests, responses and webhooks.

use crate::domain::{ChargeInitialized, ChargeRequest, ChargeVerification, GatewayEvent};
use crate::error::GatewayError;

/// Port trait for payment gateways.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Short provider name persisted on each payment, e.g. `paystack`.
    fn provider(&self) -> &'static str;

    /// HTTP header carrying the webhook signature.
    fn signature_header(&self) -> &'static str;

    /// Opens a hosted checkout for the charge.
    async fn initialize(&self, req: ChargeRequest) -> Result<ChargeInitialized, GatewayError>;

    /// Queries the gateway for the authoritative state of a charge.
    ///
    /// Always a live call; never answered from a local cache.
    async fn verify(&self, reference: &str) -> Result<ChargeVerification, GatewayError>;

    /// Checks the keyed hash over the exact raw webhook bytes.
    fn validate_webhook_signature(
        &self,
        raw_payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<(), GatewayError>;

    /// Classifies a webhook for routing. Never a source of amounts.
    fn parse_webhook_event(&self, raw_payload: &[u8]) -> Result<GatewayEvent, GatewayError>;
}
