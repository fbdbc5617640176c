//! Webhook Ingestion
//!
//! Authenticates gateway callbacks and turns a success notification into a
//! verify call. The webhook body only tells us which reference to look at;
//! its amount and status are never trusted.

use std::sync::Arc;

use wallet_types::{
    AppError, GatewayError, GatewayEventKind, PaymentGateway, PaymentStore, PaymentTransaction,
    WalletStore,
};

use crate::ReconciliationEngine;

/// What happened to an authenticated webhook.
#[derive(Debug)]
pub enum WebhookOutcome {
    /// A success event was reconciled against the gateway.
    Processed(PaymentTransaction),
    /// Acknowledged without action.
    Ignored(String),
}

pub struct WebhookIngestion<S, G>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    engine: Arc<ReconciliationEngine<S, G>>,
}

impl<S, G> WebhookIngestion<S, G>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    pub fn new(engine: Arc<ReconciliationEngine<S, G>>) -> Self {
        Self { engine }
    }

    pub fn signature_header(&self) -> &'static str {
        self.engine.gateway().signature_header()
    }

    #[tracing::instrument(skip(self, raw_payload, signature), fields(bytes = raw_payload.len()))]
    pub async fn handle(
        &self,
        raw_payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, AppError> {
        let gateway = self.engine.gateway();

        if let Err(e) = gateway.validate_webhook_signature(raw_payload, signature) {
            tracing::warn!(
                target: "security",
                provider = gateway.provider(),
                signature_present = signature.is_some(),
                "Rejected webhook with invalid signature"
            );
            return Err(e.into());
        }

        let event = gateway.parse_webhook_event(raw_payload)?;

        let reference = match event.kind {
            GatewayEventKind::ChargeSucceeded => event.reference.ok_or_else(|| {
                GatewayError::MalformedPayload("charge event without reference".into())
            })?,
            GatewayEventKind::Other(name) => {
                tracing::debug!(event = %name, "Ignoring webhook event");
                return Ok(WebhookOutcome::Ignored(name));
            }
        };

        match self.engine.verify(&reference).await {
            Ok(tx) => Ok(WebhookOutcome::Processed(tx)),
            Err(AppError::NotFound(_)) => {
                // Redelivery cannot fix an unknown reference.
                tracing::warn!(reference = %reference, "Webhook for unknown payment");
                Ok(WebhookOutcome::Ignored(format!("unknown reference {}", reference)))
            }
            Err(e) => Err(e),
        }
    }
}
