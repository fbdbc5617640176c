//! Transaction store port.

use chrono::{DateTime, Utc};

use crate::domain::{NewPayment, PaymentStatus, PaymentTransaction, StatusTransition};
use crate::error::RepoError;

/// Persistence for payment transactions keyed by reference.
///
/// `transition_status` is the single serialization point per reference and
/// MUST be an atomic conditional update.
#[async_trait::async_trait]
pub trait PaymentStore: Send + Sync + 'static {
    /// Atomically finds the record for `new.reference` or inserts it as PENDING.
    ///
    /// Returns the stored record and whether this call created it.
    async fn get_or_create(
        &self,
        new: NewPayment,
    ) -> Result<(PaymentTransaction, bool), RepoError>;

    /// Gets a payment by reference.
    async fn get_payment(&self, reference: &str) -> Result<Option<PaymentTransaction>, RepoError>;

    /// Compare-and-set on status.
    ///
    /// Fails with `RepoError::StaleTransition` when the stored status no longer
    /// equals `transition.from`, and `RepoError::NotFound` for unknown references.
    async fn transition_status(
        &self,
        transition: StatusTransition,
    ) -> Result<PaymentTransaction, RepoError>;

    /// Lists payments in any of `statuses` last updated before `older_than`.
    ///
    /// Never-checked records come first, then the least recently checked, so
    /// records that refuse to settle cannot starve the rest of the batch.
    async fn list_unsettled(
        &self,
        statuses: &[PaymentStatus],
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PaymentTransaction>, RepoError>;

    /// Lists SUCCESS payments last updated before `older_than` that have no
    /// wallet credit carrying their reference. Same ordering as `list_unsettled`.
    async fn list_uncredited(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PaymentTransaction>, RepoError>;

    /// Records a reconciliation attempt without touching status or `updated_at`.
    async fn mark_checked(&self, reference: &str, at: DateTime<Utc>) -> Result<(), RepoError>;
}
