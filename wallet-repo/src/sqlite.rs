//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use wallet_types::{
    BalanceMutation, CustomerId, EntryKind, NewPayment, PaymentStatus, PaymentStore, PaymentTransaction,
    RepoError, StatusTransition, WalletBalance, WalletEntry, WalletStore,
};

use crate::types::{DbBalance, DbEntry, DbPayment, ts};

const PAYMENT_COLUMNS: &str = "reference, customer_id, amount, currency, status, provider, \
     provider_reference, authorization_url, access_code, metadata, created_at, updated_at";

/// Never-checked first, then least recently checked.
const SWEEP_ORDER: &str =
    "ORDER BY last_checked_at IS NOT NULL, last_checked_at ASC, updated_at ASC";

const ENTRY_COLUMNS: &str = "id, customer_id, amount, kind, source, real_delta, promo_delta, \
     reference_id, description, signature, created_at";

fn db_err(e: sqlx::Error) -> RepoError {
    RepoError::Database(e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite store implementing both the payment and the wallet ports.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a new SQLite store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if !in_memory {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // Every connection to `:memory:` is a separate database, so pin one
        // connection for the lifetime of the pool.
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(8)
                .connect_with(options.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal))
                .await?
        };

        let store = Self { pool };
        store.create_schema().await?;
        tracing::debug!(in_memory, "SQLite store ready");
        Ok(store)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (idempotent).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl_payments = include_str!("../migrations/0001_create_payment_transactions.sql");
        sqlx::raw_sql(ddl_payments)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        let ddl_wallets = include_str!("../migrations/0002_create_wallet_tables.sql");
        sqlx::raw_sql(ddl_wallets)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn fetch_payment(&self, reference: &str) -> Result<Option<PaymentTransaction>, RepoError> {
        let row: Option<DbPayment> = sqlx::query_as(&format!(
            "SELECT {} FROM payment_transactions WHERE reference = ?",
            PAYMENT_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbPayment::into_domain).transpose()
    }
}

/// Metadata patches are always objects so `json_patch` merges instead of replacing.
fn metadata_patch(metadata: Option<serde_json::Value>) -> String {
    match metadata {
        None | Some(serde_json::Value::Null) => "{}".to_string(),
        Some(v @ serde_json::Value::Object(_)) => v.to_string(),
        Some(other) => serde_json::json!({ "extra": other }).to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl PaymentStore for SqliteStore {
    async fn get_or_create(
        &self,
        new: NewPayment,
    ) -> Result<(PaymentTransaction, bool), RepoError> {
        let candidate = PaymentTransaction::pending(new, Utc::now());

        let result = sqlx::query(
            r#"INSERT INTO payment_transactions
                   (reference, customer_id, amount, currency, status, provider, metadata, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(reference) DO NOTHING"#,
        )
        .bind(&candidate.reference)
        .bind(candidate.customer_id.to_string())
        .bind(candidate.amount.amount())
        .bind(candidate.amount.currency().to_string())
        .bind(candidate.status.as_str())
        .bind(&candidate.provider)
        .bind(candidate.metadata.to_string())
        .bind(ts(candidate.created_at))
        .bind(ts(candidate.updated_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let created = result.rows_affected() == 1;
        let stored = self
            .fetch_payment(&candidate.reference)
            .await?
            .ok_or(RepoError::NotFound)?;

        Ok((stored, created))
    }

    async fn get_payment(&self, reference: &str) -> Result<Option<PaymentTransaction>, RepoError> {
        self.fetch_payment(reference).await
    }

    async fn transition_status(
        &self,
        transition: StatusTransition,
    ) -> Result<PaymentTransaction, RepoError> {
        transition.validate()?;

        let (authorization_url, access_code) = match &transition.checkout {
            Some(c) => (Some(c.authorization_url.clone()), Some(c.access_code.clone())),
            None => (None, None),
        };

        // The WHERE clause on status is the compare-and-set.
        let result = sqlx::query(
            r#"UPDATE payment_transactions
               SET status = ?,
                   provider_reference = COALESCE(?, provider_reference),
                   authorization_url = COALESCE(?, authorization_url),
                   access_code = COALESCE(?, access_code),
                   metadata = json_patch(metadata, ?),
                   updated_at = MAX(updated_at, ?)
               WHERE reference = ? AND status = ?"#,
        )
        .bind(transition.to.as_str())
        .bind(&transition.provider_reference)
        .bind(authorization_url)
        .bind(access_code)
        .bind(metadata_patch(transition.metadata))
        .bind(ts(Utc::now()))
        .bind(&transition.reference)
        .bind(transition.from.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            let current: Option<String> =
                sqlx::query_scalar(r#"SELECT status FROM payment_transactions WHERE reference = ?"#)
                    .bind(&transition.reference)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(db_err)?;

            return match current {
                None => Err(RepoError::NotFound),
                Some(_) => Err(RepoError::StaleTransition {
                    reference: transition.reference,
                    expected: transition.from,
                }),
            };
        }

        self.fetch_payment(&transition.reference)
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn list_unsettled(
        &self,
        statuses: &[PaymentStatus],
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PaymentTransaction>, RepoError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM payment_transactions
             WHERE status IN ({}) AND updated_at < ?
             {}
             LIMIT ?",
            PAYMENT_COLUMNS, placeholders, SWEEP_ORDER
        );

        let mut query = sqlx::query_as::<_, DbPayment>(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        let rows = query
            .bind(ts(older_than))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter().map(DbPayment::into_domain).collect()
    }

    async fn list_uncredited(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PaymentTransaction>, RepoError> {
        let sql = format!(
            "SELECT {} FROM payment_transactions p
             WHERE p.status = ? AND p.updated_at < ?
               AND NOT EXISTS (
                   SELECT 1 FROM wallet_entries e
                   WHERE e.customer_id = p.customer_id
                     AND e.reference_id = p.reference
                     AND e.kind = ?
               )
             {}
             LIMIT ?",
            PAYMENT_COLUMNS, SWEEP_ORDER
        );

        let rows: Vec<DbPayment> = sqlx::query_as(&sql)
            .bind(PaymentStatus::Success.as_str())
            .bind(ts(older_than))
            .bind(EntryKind::Credit.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter().map(DbPayment::into_domain).collect()
    }

    async fn mark_checked(&self, reference: &str, at: DateTime<Utc>) -> Result<(), RepoError> {
        let result =
            sqlx::query(r#"UPDATE payment_transactions SET last_checked_at = ? WHERE reference = ?"#)
                .bind(ts(at))
                .bind(reference)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wallet store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl WalletStore for SqliteStore {
    async fn load_balance(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<WalletBalance>, RepoError> {
        let row: Option<DbBalance> = sqlx::query_as(
            r#"SELECT customer_id, real_balance, promo_balance, signature, version, updated_at
               FROM wallet_balances WHERE customer_id = ?"#,
        )
        .bind(customer_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbBalance::into_domain).transpose()
    }

    async fn insert_balance_if_absent(
        &self,
        initial: WalletBalance,
    ) -> Result<WalletBalance, RepoError> {
        sqlx::query(
            r#"INSERT INTO wallet_balances
                   (customer_id, real_balance, promo_balance, signature, version, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(customer_id) DO NOTHING"#,
        )
        .bind(initial.customer_id.to_string())
        .bind(initial.real_balance)
        .bind(initial.promo_balance)
        .bind(&initial.signature)
        .bind(initial.version)
        .bind(ts(initial.updated_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.load_balance(initial.customer_id)
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn apply_mutation(&self, mutation: BalanceMutation) -> Result<WalletBalance, RepoError> {
        mutation.validate()?;

        let customer = mutation.customer_id.to_string();
        let mut db_tx = self.pool.begin().await.map_err(db_err)?;

        let result = sqlx::query(
            r#"UPDATE wallet_balances
               SET real_balance = ?, promo_balance = ?, signature = ?,
                   version = version + 1, updated_at = ?
               WHERE customer_id = ? AND version = ?"#,
        )
        .bind(mutation.real_balance)
        .bind(mutation.promo_balance)
        .bind(&mutation.signature)
        .bind(ts(mutation.updated_at))
        .bind(&customer)
        .bind(mutation.expected_version)
        .execute(&mut *db_tx)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::Conflict(format!(
                "Wallet {} changed since version {}",
                mutation.customer_id, mutation.expected_version
            )));
        }

        let entry = &mutation.entry;
        sqlx::query(
            r#"INSERT INTO wallet_entries
                   (id, customer_id, amount, kind, source, real_delta, promo_delta,
                    reference_id, description, signature, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(entry.id.to_string())
        .bind(&customer)
        .bind(entry.amount)
        .bind(entry.kind.as_str())
        .bind(entry.source.as_str())
        .bind(entry.real_delta)
        .bind(entry.promo_delta)
        .bind(&entry.reference_id)
        .bind(&entry.description)
        .bind(&entry.signature)
        .bind(ts(entry.created_at))
        .execute(&mut *db_tx)
        .await
        .map_err(db_err)?;

        db_tx.commit().await.map_err(db_err)?;

        Ok(WalletBalance {
            customer_id: mutation.customer_id,
            real_balance: mutation.real_balance,
            promo_balance: mutation.promo_balance,
            signature: mutation.signature,
            version: mutation.expected_version + 1,
            updated_at: mutation.updated_at,
        })
    }

    async fn find_entry(
        &self,
        customer_id: CustomerId,
        reference_id: &str,
        kind: EntryKind,
    ) -> Result<Option<WalletEntry>, RepoError> {
        let row: Option<DbEntry> = sqlx::query_as(&format!(
            "SELECT {} FROM wallet_entries
             WHERE customer_id = ? AND reference_id = ? AND kind = ?
             LIMIT 1",
            ENTRY_COLUMNS
        ))
        .bind(customer_id.to_string())
        .bind(reference_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbEntry::into_domain).transpose()
    }

    async fn list_entries(
        &self,
        customer_id: CustomerId,
        limit: i64,
    ) -> Result<Vec<WalletEntry>, RepoError> {
        let rows: Vec<DbEntry> = sqlx::query_as(&format!(
            "SELECT {} FROM wallet_entries WHERE customer_id = ?
             ORDER BY created_at DESC, rowid DESC LIMIT ?",
            ENTRY_COLUMNS
        ))
        .bind(customer_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbEntry::into_domain).collect()
    }
}
