//! Reconciliation Engine
//!
//! Drives a payment from initialization to settlement. The gateway is the
//! only authority on whether money moved; the store's compare-and-set
//! transition decides which caller gets to credit the wallet.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::Instrument;

use wallet_types::{
    AppError, BalanceSource, ChargeRequest, ChargeVerification, Checkout, Currency, EntryKind,
    GatewayError, InitializePaymentRequest, LedgerError, Money, NewPayment, PaymentGateway,
    PaymentStatus, PaymentStore, PaymentTransaction, RepoError, StatusTransition, WalletStore,
    validate_reference,
};

use crate::ledger::WalletLedger;

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on any single gateway call.
    pub gateway_timeout: Duration,
    /// Used when an initialize request carries no callback URL.
    pub default_callback_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gateway_timeout: Duration::from_secs(15),
            default_callback_url: None,
        }
    }
}

/// Application service for payments.
///
/// Generic over a store implementing both persistence ports and a gateway,
/// injected at compile time like every other adapter.
pub struct ReconciliationEngine<S, G>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    store: Arc<S>,
    gateway: Arc<G>,
    ledger: Arc<WalletLedger<S>>,
    config: EngineConfig,
}

impl<S, G> ReconciliationEngine<S, G>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    pub fn new(
        store: Arc<S>,
        gateway: Arc<G>,
        ledger: Arc<WalletLedger<S>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            ledger,
            config,
        }
    }

    pub fn ledger(&self) -> &Arc<WalletLedger<S>> {
        &self.ledger
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Starts (or replays) a payment attempt.
    ///
    /// Safe to retry with the same reference: a settled payment is returned
    /// as stored without contacting the gateway.
    #[tracing::instrument(skip(self, req), fields(reference = %req.reference, customer_id = %req.customer_id, amount = req.amount))]
    pub async fn initialize(
        &self,
        req: InitializePaymentRequest,
    ) -> Result<PaymentTransaction, AppError> {
        validate_reference(&req.reference)?;
        let amount = Money::new(req.amount, req.currency)?;
        if !req.email.contains('@') {
            return Err(AppError::BadRequest("A valid customer email is required".into()));
        }

        let new = NewPayment {
            reference: req.reference.clone(),
            customer_id: req.customer_id,
            amount,
            provider: self.gateway.provider().to_string(),
            metadata: req.metadata.clone(),
        };
        let (tx, created) = self.store.get_or_create(new.clone()).await?;

        if !created && !tx.matches(&new) {
            tracing::warn!("Reference reused with a different customer or amount");
            return Err(AppError::Conflict(format!(
                "Reference {} already belongs to a different payment",
                tx.reference
            )));
        }

        if tx.status == PaymentStatus::Success {
            tracing::debug!("Payment already settled; returning stored result");
            return Ok(tx);
        }

        let charge = ChargeRequest {
            amount: amount.amount(),
            currency: amount.currency(),
            email: req.email,
            reference: tx.reference.clone(),
            callback_url: req
                .callback_url
                .or_else(|| self.config.default_callback_url.clone()),
            metadata: Some(json!({ "customer_id": tx.customer_id.to_string() })),
        };

        // A timeout here leaves the record PENDING; retrying is idempotent.
        let init = self.bounded(self.gateway.initialize(charge)).await?;

        let transition =
            StatusTransition::new(&tx.reference, PaymentStatus::Pending, PaymentStatus::Processing)
                .with_checkout(Checkout {
                    authorization_url: init.authorization_url,
                    access_code: init.access_code,
                });

        match self.store.transition_status(transition).await {
            Ok(updated) => {
                tracing::info!("Payment initialized");
                Ok(updated)
            }
            Err(RepoError::StaleTransition { .. }) => {
                tracing::debug!("Payment advanced concurrently; returning stored record");
                self.load(&tx.reference).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reconciles a payment against the gateway's authoritative state.
    ///
    /// Only the caller whose SUCCESS transition lands credits the wallet. A
    /// SUCCESS record found without its credit is credited here.
    #[tracing::instrument(skip(self))]
    pub async fn verify(&self, reference: &str) -> Result<PaymentTransaction, AppError> {
        let tx = self.load(reference).await?;
        if tx.status == PaymentStatus::Success {
            return self.ensure_credited(tx).await;
        }
        if tx.status.is_terminal() {
            return Ok(tx);
        }

        let verification = self.bounded(self.gateway.verify(reference)).await?;

        let Some(target) = PaymentStatus::from_gateway_status(&verification.status) else {
            tracing::debug!(gateway_status = %verification.status, "Charge not settled yet");
            return Ok(tx);
        };

        if target == PaymentStatus::Success {
            self.ensure_amount_matches(&tx, &verification)?;
        }

        let transition = StatusTransition::new(reference, tx.status, target)
            .with_provider_reference(verification.provider_reference.clone())
            .with_metadata(settlement_metadata(&verification));

        // Runs detached so a dropped caller cannot split the transition from its credit.
        let settlement = tokio::spawn(
            settle(self.store.clone(), self.ledger.clone(), transition).in_current_span(),
        );
        settlement
            .await
            .map_err(|e| AppError::Internal(format!("Settlement task failed: {}", e)))?
    }

    /// Payments still waiting on the gateway.
    pub async fn unsettled(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PaymentTransaction>, AppError> {
        self.store
            .list_unsettled(
                &[PaymentStatus::Pending, PaymentStatus::Processing],
                older_than,
                limit,
            )
            .await
            .map_err(Into::into)
    }

    /// SUCCESS payments whose wallet credit never landed.
    pub async fn uncredited(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PaymentTransaction>, AppError> {
        self.store
            .list_uncredited(older_than, limit)
            .await
            .map_err(Into::into)
    }

    /// Records that a background pass looked at this payment.
    pub async fn mark_checked(&self, reference: &str) -> Result<(), AppError> {
        self.store
            .mark_checked(reference, Utc::now())
            .await
            .map_err(Into::into)
    }

    async fn ensure_credited(&self, tx: PaymentTransaction) -> Result<PaymentTransaction, AppError> {
        let credited = self
            .ledger
            .entry(tx.customer_id, &tx.reference, EntryKind::Credit)
            .await?;
        if credited.is_none() {
            tracing::warn!("Settled payment has no wallet credit; crediting now");
            credit_payment(&self.ledger, &tx).await?;
        }
        Ok(tx)
    }

    fn ensure_amount_matches(
        &self,
        tx: &PaymentTransaction,
        verification: &ChargeVerification,
    ) -> Result<(), AppError> {
        let currency_matches = verification
            .currency
            .parse::<Currency>()
            .is_ok_and(|c| c == tx.amount.currency());
        if verification.amount == tx.amount.amount() && currency_matches {
            return Ok(());
        }
        tracing::error!(
            target: "security",
            reference = %tx.reference,
            expected_amount = tx.amount.amount(),
            expected_currency = %tx.amount.currency(),
            gateway_amount = verification.amount,
            gateway_currency = %verification.currency,
            "Gateway reported a different amount for a successful charge"
        );
        Err(AppError::Conflict(format!(
            "Gateway amount mismatch for {}",
            tx.reference
        )))
    }

    async fn load(&self, reference: &str) -> Result<PaymentTransaction, AppError> {
        self.store
            .get_payment(reference)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment {}", reference)))
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.config.gateway_timeout, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.gateway_timeout.as_millis() as u64,
                    "Gateway call timed out"
                );
                Err(AppError::GatewayUnavailable("Gateway call timed out".into()))
            }
        }
    }
}

/// Applies a settlement transition and, for the winner of a SUCCESS
/// transition, the matching wallet credit.
async fn settle<S>(
    store: Arc<S>,
    ledger: Arc<WalletLedger<S>>,
    transition: StatusTransition,
) -> Result<PaymentTransaction, AppError>
where
    S: PaymentStore + WalletStore,
{
    let reference = transition.reference.clone();
    let updated = match store.transition_status(transition).await {
        Ok(updated) => updated,
        Err(RepoError::StaleTransition { .. }) => {
            tracing::debug!("Lost settlement race; another caller owns the credit");
            return store
                .get_payment(&reference)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Payment {}", reference)));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(status = %updated.status, "Payment settled");

    if updated.status == PaymentStatus::Success {
        credit_payment(&ledger, &updated).await?;
    }
    Ok(updated)
}

async fn credit_payment<W: WalletStore>(
    ledger: &WalletLedger<W>,
    tx: &PaymentTransaction,
) -> Result<(), AppError> {
    let amount = tx.amount.amount();
    match ledger
        .credit_real(tx.customer_id, amount, &tx.reference)
        .await
    {
        Ok(_) => Ok(()),
        Err(LedgerError::DuplicateReference(_)) => {
            // Only a real credit of the same amount counts as this payment's credit.
            match ledger
                .entry(tx.customer_id, &tx.reference, EntryKind::Credit)
                .await?
            {
                Some(entry) if entry.source == BalanceSource::Real && entry.amount == amount => {
                    tracing::debug!(reference = %tx.reference, "Payment was already credited");
                    Ok(())
                }
                _ => {
                    tracing::error!(
                        target: "security",
                        reference = %tx.reference,
                        customer_id = %tx.customer_id,
                        "Payment reference already carries a different wallet credit"
                    );
                    Err(AppError::Conflict(format!(
                        "Reference {} already carries a different wallet credit",
                        tx.reference
                    )))
                }
            }
        }
        Err(e) => {
            tracing::error!(
                reference = %tx.reference,
                customer_id = %tx.customer_id,
                error = %e,
                "Payment settled but wallet credit failed; left for the sweep to retry"
            );
            Err(e.into())
        }
    }
}

fn settlement_metadata(v: &ChargeVerification) -> serde_json::Value {
    json!({
        "gateway_status": v.status,
        "paid_at": v.paid_at.map(|t| t.to_rfc3339()),
        "channel": v.channel,
    })
}
