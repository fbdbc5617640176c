//! Error types for the payment reconciliation and wallet ledger service.

use crate::domain::{CustomerId, PaymentStatus};

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Invalid status transition {from} -> {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The guarded status update lost a race; the stored status moved on.
    #[error("Stale transition for {reference}: expected status {expected}")]
    StaleTransition {
        reference: String,
        expected: PaymentStatus,
    },
}

/// Errors raised by the payment gateway adapter.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Network failure, timeout, 5xx or rate limiting. Retry with backoff.
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    /// Business-level decline. Not retryable.
    #[error("Gateway rejected request: {0}")]
    Rejected(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),
}

/// Errors raised by the wallet ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Stored signature does not match the balance. The account is frozen.
    #[error("Integrity violation on wallet {customer_id}; account frozen")]
    IntegrityViolation { customer_id: CustomerId },

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Reference already applied: {0}")]
    DuplicateReference(String),

    #[error(transparent)]
    Domain(DomainError),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<DomainError> for LedgerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientFunds {
                available,
                requested,
            } => LedgerError::InsufficientFunds {
                available,
                requested,
            },
            other => LedgerError::Domain(other),
        }
    }
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Wallet {0} is frozen pending manual reconciliation")]
    AccountFrozen(CustomerId),

    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Payment gateway rejected the request: {0}")]
    GatewayRejected(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a client may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::GatewayUnavailable(_))
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientFunds {
                available,
                requested,
            } => AppError::InsufficientFunds {
                available,
                requested,
            },
            DomainError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            e => AppError::BadRequest(e.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::Conflict(e),
            // Callers swallow stale transitions; reaching here is a bug.
            e @ RepoError::StaleTransition { .. } => AppError::Internal(e.to_string()),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(msg) => AppError::GatewayUnavailable(msg),
            GatewayError::Rejected(msg) => AppError::GatewayRejected(msg),
            GatewayError::InvalidSignature => {
                AppError::Unauthorized("Invalid webhook signature".into())
            }
            GatewayError::MalformedPayload(msg) => AppError::BadRequest(msg),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::IntegrityViolation { customer_id } => AppError::AccountFrozen(customer_id),
            LedgerError::InsufficientFunds {
                available,
                requested,
            } => AppError::InsufficientFunds {
                available,
                requested,
            },
            LedgerError::DuplicateReference(r) => {
                AppError::Conflict(format!("Reference already applied: {}", r))
            }
            LedgerError::Domain(e) => e.into(),
            LedgerError::Repo(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_flattens_into_ledger_error() {
        let err: LedgerError = DomainError::InsufficientFunds {
            available: 10,
            requested: 20,
        }
        .into();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                available: 10,
                requested: 20
            }
        ));
    }

    #[test]
    fn test_retryable_classification() {
        let transient: AppError = GatewayError::Unavailable("timeout".into()).into();
        let terminal: AppError = GatewayError::Rejected("declined".into()).into();
        assert!(transient.is_retryable());
        assert!(!terminal.is_retryable());
    }

    #[test]
    fn test_integrity_violation_maps_to_frozen() {
        let customer = CustomerId::new();
        let err: AppError = LedgerError::IntegrityViolation {
            customer_id: customer,
        }
        .into();
        assert!(matches!(err, AppError::AccountFrozen(id) if id == customer));
    }
}
