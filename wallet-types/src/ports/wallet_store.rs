//! Wallet store port.

use crate::domain::{BalanceMutation, CustomerId, EntryKind, WalletBalance, WalletEntry};
use crate::error::RepoError;

/// Persistence for wallet balances and their append-only entry log.
///
/// The store never computes signatures; it persists what the ledger signed.
#[async_trait::async_trait]
pub trait WalletStore: Send + Sync + 'static {
    /// Loads the balance record for a customer, if any.
    async fn load_balance(&self, customer_id: CustomerId)
    -> Result<Option<WalletBalance>, RepoError>;

    /// Inserts `initial` unless a record already exists; returns the stored record.
    async fn insert_balance_if_absent(
        &self,
        initial: WalletBalance,
    ) -> Result<WalletBalance, RepoError>;

    /// Writes the new balance and appends its entry in one atomic unit.
    ///
    /// Fails with `RepoError::Conflict` if the stored version is not
    /// `mutation.expected_version`. Returns the balance with its new version.
    async fn apply_mutation(&self, mutation: BalanceMutation) -> Result<WalletBalance, RepoError>;

    /// Finds a customer's entry of the given kind by its reference id.
    ///
    /// Credits and debits keep separate reference namespaces: a debit named
    /// after an order never shadows the payment credit for that order.
    async fn find_entry(
        &self,
        customer_id: CustomerId,
        reference_id: &str,
        kind: EntryKind,
    ) -> Result<Option<WalletEntry>, RepoError>;

    /// Lists a customer's entries, newest first.
    async fn list_entries(
        &self,
        customer_id: CustomerId,
        limit: i64,
    ) -> Result<Vec<WalletEntry>, RepoError>;
}
