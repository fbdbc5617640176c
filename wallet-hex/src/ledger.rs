//! Wallet Ledger
//!
//! The only writer of wallet balances. Every read verifies the balance
//! signature; every mutation runs under the customer's lock and commits the
//! new signed balance together with its signed entry.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use wallet_repo::IntegritySigner;
use wallet_types::{
    BalanceMutation, BalanceSource, CustomerId, DomainError, EntryKind, LedgerError,
    WalletBalance, WalletEntry, WalletStore, validate_reference,
};

use crate::locks::KeyedLocks;

/// Default replay window for administrative promo credits.
pub const DEFAULT_PROMO_DEDUP_WINDOW: Duration = Duration::from_secs(300);

/// A committed mutation.
#[derive(Debug, Clone)]
pub struct Posting {
    pub balance: WalletBalance,
    pub entry: WalletEntry,
}

/// Signed balance deltas for one entry.
struct Delta<'a> {
    kind: EntryKind,
    source: BalanceSource,
    real: i64,
    promo: i64,
    reference_id: &'a str,
    description: String,
}

pub struct WalletLedger<W: WalletStore> {
    store: Arc<W>,
    signer: Arc<IntegritySigner>,
    locks: KeyedLocks<CustomerId>,
    promo_dedup_window: Duration,
}

impl<W: WalletStore> WalletLedger<W> {
    pub fn new(store: Arc<W>, signer: Arc<IntegritySigner>) -> Self {
        Self {
            store,
            signer,
            locks: KeyedLocks::new(),
            promo_dedup_window: DEFAULT_PROMO_DEDUP_WINDOW,
        }
    }

    pub fn with_promo_dedup_window(mut self, window: Duration) -> Self {
        self.promo_dedup_window = window;
        self
    }

    /// Number of customers with a lock entry right now.
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    /// Returns the verified balance, creating a zeroed record on first touch.
    #[tracing::instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_balance(&self, customer_id: CustomerId) -> Result<WalletBalance, LedgerError> {
        self.load_verified(customer_id).await
    }

    /// Credits confirmed external funds.
    #[tracing::instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn credit_real(
        &self,
        customer_id: CustomerId,
        amount: i64,
        reference_id: &str,
    ) -> Result<Posting, LedgerError> {
        ensure_positive(amount)?;
        validate_reference(reference_id)?;

        let _guard = self.locks.lock(customer_id).await;
        self.ensure_unapplied(customer_id, reference_id, EntryKind::Credit)
            .await?;
        let posting = self
            .apply(
                customer_id,
                Delta {
                    kind: EntryKind::Credit,
                    source: BalanceSource::Real,
                    real: amount,
                    promo: 0,
                    reference_id,
                    description: format!("Payment {}", reference_id),
                },
            )
            .await?;

        tracing::info!(amount, reference_id, "Real balance credited");
        Ok(posting)
    }

    /// Credits promotional funds on behalf of an operator.
    ///
    /// The same `(customer, reason, actor)` inside one dedup window maps to the
    /// same reference, so an accidental double submit is rejected.
    #[tracing::instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn credit_promo(
        &self,
        customer_id: CustomerId,
        amount: i64,
        reason: &str,
        actor_id: &str,
    ) -> Result<Posting, LedgerError> {
        ensure_positive(amount)?;
        if reason.trim().is_empty() || actor_id.trim().is_empty() {
            return Err(
                DomainError::ValidationError("Promo credit needs a reason and an actor".into())
                    .into(),
            );
        }

        let reference_id = self.promo_reference(customer_id, reason, actor_id);

        let _guard = self.locks.lock(customer_id).await;
        self.ensure_unapplied(customer_id, &reference_id, EntryKind::Credit)
            .await?;
        let posting = self
            .apply(
                customer_id,
                Delta {
                    kind: EntryKind::Credit,
                    source: BalanceSource::Promo,
                    real: 0,
                    promo: amount,
                    reference_id: &reference_id,
                    description: format!("Promo by {}: {}", actor_id, reason),
                },
            )
            .await?;

        tracing::info!(amount, actor_id, reference_id = %reference_id, "Promo balance credited");
        Ok(posting)
    }

    /// Debits the wallet, consuming promo funds before real funds.
    #[tracing::instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn debit(
        &self,
        customer_id: CustomerId,
        amount: i64,
        reference_id: &str,
    ) -> Result<Posting, LedgerError> {
        ensure_positive(amount)?;
        validate_reference(reference_id)?;

        let _guard = self.locks.lock(customer_id).await;
        self.ensure_unapplied(customer_id, reference_id, EntryKind::Debit)
            .await?;

        let current = self.load_verified(customer_id).await?;
        let plan = current.plan_debit(amount)?;

        let posting = self
            .apply_to(
                current,
                Delta {
                    kind: EntryKind::Debit,
                    source: plan.source(),
                    real: -plan.from_real,
                    promo: -plan.from_promo,
                    reference_id,
                    description: format!("Debit {}", reference_id),
                },
            )
            .await?;

        tracing::info!(
            amount,
            from_promo = plan.from_promo,
            from_real = plan.from_real,
            "Wallet debited"
        );
        Ok(posting)
    }

    /// Returns funds to the real balance.
    ///
    /// Each call produces a new entry; repeated refunds of one charge are not merged.
    #[tracing::instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn refund(
        &self,
        customer_id: CustomerId,
        original_reference_id: &str,
        amount: i64,
    ) -> Result<Posting, LedgerError> {
        ensure_positive(amount)?;
        validate_reference(original_reference_id)?;

        let reference_id = format!(
            "REFUND-{}-{}",
            original_reference_id,
            Utc::now().timestamp_millis()
        );

        let _guard = self.locks.lock(customer_id).await;
        let posting = self
            .apply(
                customer_id,
                Delta {
                    kind: EntryKind::Credit,
                    source: BalanceSource::Real,
                    real: amount,
                    promo: 0,
                    reference_id: &reference_id,
                    description: format!("Refund for {}", original_reference_id),
                },
            )
            .await?;

        tracing::info!(amount, reference_id = %reference_id, "Refund credited");
        Ok(posting)
    }

    /// Most recent entries first. Any entry failing its signature freezes the read.
    #[tracing::instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn history(
        &self,
        customer_id: CustomerId,
        limit: i64,
    ) -> Result<Vec<WalletEntry>, LedgerError> {
        let entries = self.store.list_entries(customer_id, limit.clamp(1, 500)).await?;
        if let Some(bad) = entries.iter().find(|e| !self.signer.verify_entry(e)) {
            tracing::error!(
                target: "security",
                customer_id = %customer_id,
                entry_id = %bad.id,
                "Ledger entry signature mismatch"
            );
            return Err(LedgerError::IntegrityViolation { customer_id });
        }
        Ok(entries)
    }

    /// Looks up one entry by reference, verifying its signature.
    pub async fn entry(
        &self,
        customer_id: CustomerId,
        reference_id: &str,
        kind: EntryKind,
    ) -> Result<Option<WalletEntry>, LedgerError> {
        let Some(entry) = self
            .store
            .find_entry(customer_id, reference_id, kind)
            .await?
        else {
            return Ok(None);
        };
        if !self.signer.verify_entry(&entry) {
            tracing::error!(
                target: "security",
                customer_id = %customer_id,
                entry_id = %entry.id,
                "Ledger entry signature mismatch"
            );
            return Err(LedgerError::IntegrityViolation { customer_id });
        }
        Ok(Some(entry))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    async fn load_verified(&self, customer_id: CustomerId) -> Result<WalletBalance, LedgerError> {
        let balance = match self.store.load_balance(customer_id).await? {
            Some(b) => b,
            None => {
                let zero = WalletBalance {
                    customer_id,
                    real_balance: 0,
                    promo_balance: 0,
                    signature: self.signer.sign_balance(customer_id, 0, 0),
                    version: 0,
                    updated_at: Utc::now(),
                };
                self.store.insert_balance_if_absent(zero).await?
            }
        };

        if !self.signer.verify_balance(&balance) {
            tracing::error!(
                target: "security",
                customer_id = %customer_id,
                version = balance.version,
                "Wallet balance signature mismatch; account frozen"
            );
            return Err(LedgerError::IntegrityViolation { customer_id });
        }
        Ok(balance)
    }

    async fn ensure_unapplied(
        &self,
        customer_id: CustomerId,
        reference_id: &str,
        kind: EntryKind,
    ) -> Result<(), LedgerError> {
        if self
            .store
            .find_entry(customer_id, reference_id, kind)
            .await?
            .is_some()
        {
            return Err(LedgerError::DuplicateReference(reference_id.to_string()));
        }
        Ok(())
    }

    /// Caller must hold the customer's lock.
    async fn apply(&self, customer_id: CustomerId, delta: Delta<'_>) -> Result<Posting, LedgerError> {
        let current = self.load_verified(customer_id).await?;
        self.apply_to(current, delta).await
    }

    async fn apply_to(
        &self,
        current: WalletBalance,
        delta: Delta<'_>,
    ) -> Result<Posting, LedgerError> {
        let customer_id = current.customer_id;
        let real_balance = checked(current.real_balance, delta.real)?;
        let promo_balance = checked(current.promo_balance, delta.promo)?;
        let amount = delta.real + delta.promo;
        let now = Utc::now();

        let entry = WalletEntry {
            id: Uuid::new_v4(),
            customer_id,
            amount,
            kind: delta.kind,
            source: delta.source,
            real_delta: delta.real,
            promo_delta: delta.promo,
            reference_id: delta.reference_id.to_string(),
            description: delta.description,
            signature: self
                .signer
                .sign_entry(customer_id, amount, delta.kind, delta.reference_id),
            created_at: now,
        };

        let mutation = BalanceMutation {
            customer_id,
            expected_version: current.version,
            real_balance,
            promo_balance,
            signature: self
                .signer
                .sign_balance(customer_id, real_balance, promo_balance),
            updated_at: now,
            entry: entry.clone(),
        };
        mutation.validate()?;

        let balance = self.store.apply_mutation(mutation).await?;
        Ok(Posting { balance, entry })
    }

    fn promo_reference(&self, customer_id: CustomerId, reason: &str, actor_id: &str) -> String {
        let window = self.promo_dedup_window.as_secs().max(1) as i64;
        let bucket = Utc::now().timestamp() / window;
        let digest = Sha256::digest(
            format!("{}|{}|{}|{}", customer_id, reason.trim(), actor_id.trim(), bucket).as_bytes(),
        );
        format!("PROMO-{}", &hex::encode(digest)[..24])
    }
}

fn ensure_positive(amount: i64) -> Result<(), DomainError> {
    if amount <= 0 {
        return Err(DomainError::NonPositiveAmount(amount));
    }
    Ok(())
}

fn checked(balance: i64, delta: i64) -> Result<i64, DomainError> {
    balance
        .checked_add(delta)
        .ok_or_else(|| DomainError::ValidationError("Balance overflow".into()))
}
