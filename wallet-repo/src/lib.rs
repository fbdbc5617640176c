//! # Wallet Repository
//!
//! Concrete repository implementations (adapters) for the wallet ledger service.
//! This crate provides the database adapter that implements the `PaymentStore`
//! and `WalletStore` ports, plus the integrity signer used to seal persisted
//! balances.

#[cfg(not(feature = "sqlite"))]
compile_error!("Enable a repo feature: `sqlite`.");

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
mod types;

pub mod security;


pub use security::IntegritySigner;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Build and initialize a store from a database URL.
///
/// This function:
/// 1. Connects to the database
/// 2. Runs migrations to create tables
/// 3. Returns a ready-to-use `SqliteStore`
///
/// # Examples
///
/// ```ignore
/// let store = build_store("sqlite://data/wallet.db?mode=rwc").await?;
/// ```
#[cfg(feature = "sqlite")]
pub async fn build_store(database_url: &str) -> anyhow::Result<SqliteStore> {
    SqliteStore::new(database_url).await
}
