//! Wallet balance and append-only ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::customer::CustomerId;
use crate::error::DomainError;

/// A customer's dual balance. Amounts are minor units.
///
/// `signature` binds `(customer_id, real_balance, promo_balance)`; `version` is
/// an optimistic concurrency counter and is deliberately not signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub customer_id: CustomerId,
    /// Funds backed by confirmed external payments or refunds
    pub real_balance: i64,
    /// Funds credited administratively, spent first
    pub promo_balance: i64,
    pub signature: String,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl WalletBalance {
    pub fn total(&self) -> i64 {
        self.real_balance.saturating_add(self.promo_balance)
    }

    /// Splits a debit across the sub-balances: promo first, then real.
    ///
    /// Fails without side effects when the combined balance is short.
    pub fn plan_debit(&self, amount: i64) -> Result<DebitPlan, DomainError> {
        if amount <= 0 {
            return Err(DomainError::NonPositiveAmount(amount));
        }
        let available = self.total();
        if available < amount {
            return Err(DomainError::InsufficientFunds {
                available,
                requested: amount,
            });
        }
        let from_promo = amount.min(self.promo_balance);
        let from_real = amount - from_promo;
        Ok(DebitPlan {
            from_promo,
            from_real,
        })
    }
}

/// How a debit is financed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebitPlan {
    pub from_promo: i64,
    pub from_real: i64,
}

impl DebitPlan {
    pub fn source(&self) -> BalanceSource {
        match (self.from_promo > 0, self.from_real > 0) {
            (true, true) => BalanceSource::Split,
            (true, false) => BalanceSource::Promo,
            _ => BalanceSource::Real,
        }
    }
}

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    Credit,
    Debit,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Credit => "CREDIT",
            EntryKind::Debit => "DEBIT",
        }
    }
}

impl std::str::FromStr for EntryKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT" => Ok(EntryKind::Credit),
            "DEBIT" => Ok(EntryKind::Debit),
            other => Err(DomainError::ValidationError(format!(
                "Unknown entry kind: {}",
                other
            ))),
        }
    }
}

/// Which sub-balance(s) an entry touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceSource {
    Real,
    Promo,
    Split,
}

impl BalanceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceSource::Real => "REAL",
            BalanceSource::Promo => "PROMO",
            BalanceSource::Split => "SPLIT",
        }
    }
}

impl std::str::FromStr for BalanceSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REAL" => Ok(BalanceSource::Real),
            "PROMO" => Ok(BalanceSource::Promo),
            "SPLIT" => Ok(BalanceSource::Split),
            other => Err(DomainError::ValidationError(format!(
                "Unknown balance source: {}",
                other
            ))),
        }
    }
}

/// Append-only audit record of one balance mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletEntry {
    pub id: Uuid,
    pub customer_id: CustomerId,
    /// Signed: positive for credits, negative for debits
    pub amount: i64,
    pub kind: EntryKind,
    pub source: BalanceSource,
    pub real_delta: i64,
    pub promo_delta: i64,
    pub reference_id: String,
    pub description: String,
    /// Binds customer_id + amount + kind + reference_id
    pub signature: String,
    pub created_at: DateTime<Utc>,
}

/// A balance update plus the entry that explains it, committed atomically.
#[derive(Debug, Clone)]
pub struct BalanceMutation {
    pub customer_id: CustomerId,
    /// Version the caller read; the write fails if it moved
    pub expected_version: i64,
    pub real_balance: i64,
    pub promo_balance: i64,
    pub signature: String,
    pub updated_at: DateTime<Utc>,
    pub entry: WalletEntry,
}

impl BalanceMutation {
    /// Rejects any mutation that would leave a sub-balance negative.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.real_balance < 0 || self.promo_balance < 0 {
            return Err(DomainError::ValidationError(format!(
                "Negative sub-balance for {}: real={}, promo={}",
                self.customer_id, self.real_balance, self.promo_balance
            )));
        }
        if self.entry.customer_id != self.customer_id {
            return Err(DomainError::ValidationError(
                "Entry belongs to a different customer".into(),
            ));
        }
        Ok(())
    }
}
