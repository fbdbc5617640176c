//! Database row types and their mapping onto domain types.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::FromRow;

use wallet_types::{
    Checkout, Currency, CustomerId, Money, PaymentStatus, PaymentTransaction, RepoError,
    WalletBalance, WalletEntry,
};

// ─────────────────────────────────────────────────────────────────────────────
// Column helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
pub fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepoError::Database(format!("Invalid timestamp {:?}: {}", value, e)))
}

fn parse_customer(value: &str) -> Result<CustomerId, RepoError> {
    value
        .parse()
        .map_err(|e| RepoError::Database(format!("Invalid customer id {:?}: {}", value, e)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Payment transaction row from database.
#[derive(FromRow)]
pub struct DbPayment {
    pub reference: String,
    pub customer_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub provider: String,
    pub provider_reference: Option<String>,
    pub authorization_url: Option<String>,
    pub access_code: Option<String>,
    pub metadata: String,
    pub created_at: String,
    pub updated_at: String,
}

impl DbPayment {
    pub fn into_domain(self) -> Result<PaymentTransaction, RepoError> {
        let currency: Currency = self.currency.parse()?;
        let checkout = match (self.authorization_url, self.access_code) {
            (Some(authorization_url), Some(access_code)) => Some(Checkout {
                authorization_url,
                access_code,
            }),
            _ => None,
        };
        let metadata = serde_json::from_str(&self.metadata)
            .map_err(|e| RepoError::Database(format!("Invalid metadata: {}", e)))?;

        Ok(PaymentTransaction {
            customer_id: parse_customer(&self.customer_id)?,
            amount: Money::new(self.amount, currency)?,
            status: self.status.parse::<PaymentStatus>()?,
            provider: self.provider,
            provider_reference: self.provider_reference,
            checkout,
            metadata,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            reference: self.reference,
        })
    }
}

/// Wallet balance row from database.
#[derive(FromRow)]
pub struct DbBalance {
    pub customer_id: String,
    pub real_balance: i64,
    pub promo_balance: i64,
    pub signature: String,
    pub version: i64,
    pub updated_at: String,
}

impl DbBalance {
    pub fn into_domain(self) -> Result<WalletBalance, RepoError> {
        Ok(WalletBalance {
            customer_id: parse_customer(&self.customer_id)?,
            real_balance: self.real_balance,
            promo_balance: self.promo_balance,
            signature: self.signature,
            version: self.version,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

/// Wallet entry row from database.
#[derive(FromRow)]
pub struct DbEntry {
    pub id: String,
    pub customer_id: String,
    pub amount: i64,
    pub kind: String,
    pub source: String,
    pub real_delta: i64,
    pub promo_delta: i64,
    pub reference_id: String,
    pub description: String,
    pub signature: String,
    pub created_at: String,
}

impl DbEntry {
    pub fn into_domain(self) -> Result<WalletEntry, RepoError> {
        let id = uuid::Uuid::parse_str(&self.id)
            .map_err(|e| RepoError::Database(format!("Invalid entry id: {}", e)))?;
        Ok(WalletEntry {
            id,
            customer_id: parse_customer(&self.customer_id)?,
            amount: self.amount,
            kind: self.kind.parse()?,
            source: self.source.parse()?,
            real_delta: self.real_delta,
            promo_delta: self.promo_delta,
            reference_id: self.reference_id,
            description: self.description,
            signature: self.signature,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}
