//! Payment transaction domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::customer::CustomerId;
use super::money::Money;
use crate::error::DomainError;

/// Lifecycle state of a payment attempt.
///
/// `PENDING → PROCESSING → SUCCESS | FAILED`. SUCCESS and FAILED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Success | PaymentStatus::Failed)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// PENDING may settle directly: an Initialize that timed out after the
    /// gateway accepted the charge is still verifiable.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Success)
                | (Pending, Failed)
                | (Processing, Success)
                | (Processing, Failed)
        )
    }

    /// Maps a gateway's textual charge status onto the internal enum.
    ///
    /// `None` means the charge has not settled yet and no transition applies.
    pub fn from_gateway_status(status: &str) -> Option<PaymentStatus> {
        match status.trim().to_ascii_lowercase().as_str() {
            "success" => Some(PaymentStatus::Success),
            "failed" | "abandoned" | "reversed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PROCESSING" => Ok(PaymentStatus::Processing),
            "SUCCESS" => Ok(PaymentStatus::Success),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(DomainError::ValidationError(format!(
                "Unknown payment status: {}",
                other
            ))),
        }
    }
}

/// Hosted checkout handle returned by the gateway on initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    pub authorization_url: String,
    pub access_code: String,
}

/// A payment attempt identified by its caller-chosen reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    /// Idempotency key chosen by the caller; immutable
    pub reference: String,
    pub customer_id: CustomerId,
    pub amount: Money,
    pub status: PaymentStatus,
    /// Gateway name, e.g. `paystack`
    pub provider: String,
    /// Gateway-assigned identifier, set once verification succeeds
    pub provider_reference: Option<String>,
    pub checkout: Option<Checkout>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a PENDING payment record.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub reference: String,
    pub customer_id: CustomerId,
    pub amount: Money,
    pub provider: String,
    pub metadata: Option<serde_json::Value>,
}

impl PaymentTransaction {
    /// Builds the initial PENDING record for a new reference.
    pub fn pending(new: NewPayment, now: DateTime<Utc>) -> Self {
        Self {
            reference: new.reference,
            customer_id: new.customer_id,
            amount: new.amount,
            status: PaymentStatus::Pending,
            provider: new.provider,
            provider_reference: None,
            checkout: None,
            metadata: new.metadata.unwrap_or_else(|| serde_json::json!({})),
            created_at: now,
            updated_at: now,
        }
    }

    /// True when an existing record was created for the same logical charge.
    pub fn matches(&self, new: &NewPayment) -> bool {
        self.customer_id == new.customer_id && self.amount == new.amount
    }
}

/// A guarded compare-and-set status change.
#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub reference: String,
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    pub provider_reference: Option<String>,
    pub checkout: Option<Checkout>,
    /// Merged into the stored metadata object
    pub metadata: Option<serde_json::Value>,
}

impl StatusTransition {
    pub fn new(reference: impl Into<String>, from: PaymentStatus, to: PaymentStatus) -> Self {
        Self {
            reference: reference.into(),
            from,
            to,
            provider_reference: None,
            checkout: None,
            metadata: None,
        }
    }

    pub fn with_provider_reference(mut self, provider_reference: Option<String>) -> Self {
        self.provider_reference = provider_reference;
        self
    }

    pub fn with_checkout(mut self, checkout: Checkout) -> Self {
        self.checkout = Some(checkout);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Rejects transitions the state machine does not allow.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.from.can_transition_to(self.to) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                from: self.from,
                to: self.to,
            })
        }
    }
}

/// Longest reference the gateway accepts.
pub const MAX_REFERENCE_LEN: usize = 100;

/// Checks a caller-chosen reference or ledger reference id.
///
/// Allowed characters are `[A-Za-z0-9-._=]`, matching what the gateway accepts.
pub fn validate_reference(reference: &str) -> Result<(), DomainError> {
    if reference.is_empty() || reference.len() > MAX_REFERENCE_LEN {
        return Err(DomainError::ValidationError(format!(
            "Reference must be 1-{} characters",
            MAX_REFERENCE_LEN
        )));
    }
    let valid = reference
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '='));
    if !valid {
        return Err(DomainError::ValidationError(format!(
            "Reference contains invalid characters: {}",
            reference
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Currency;
    use serde_json::json;

    #[test]
    fn test_state_machine() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Success));
        assert!(Processing.can_transition_to(Failed));
        assert!(Pending.can_transition_to(Success));

        assert!(!Success.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Success));
        assert!(!Processing.can_transition_to(Pending));
        assert!(!Success.can_transition_to(Success));
    }

    #[test]
    fn test_gateway_status_mapping() {
        assert_eq!(
            PaymentStatus::from_gateway_status("success"),
            Some(PaymentStatus::Success)
        );
        assert_eq!(
            PaymentStatus::from_gateway_status("abandoned"),
            Some(PaymentStatus::Failed)
        );
        assert_eq!(
            PaymentStatus::from_gateway_status("Reversed"),
            Some(PaymentStatus::Failed)
        );
        assert_eq!(PaymentStatus::from_gateway_status("ongoing"), None);
        assert_eq!(PaymentStatus::from_gateway_status("queued"), None);
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let t = StatusTransition::new("ref-1", PaymentStatus::Success, PaymentStatus::Failed);
        assert!(matches!(
            t.validate(),
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_pending_record() {
        let customer = CustomerId::new();
        let tx = PaymentTransaction::pending(
            NewPayment {
                reference: "ref-1".into(),
                customer_id: customer,
                amount: Money::new(5000, Currency::NGN).unwrap(),
                provider: "paystack".into(),
                metadata: None,
            },
            Utc::now(),
        );
        assert_eq!(tx.status, PaymentStatus::Pending);
        assert_eq!(tx.metadata, json!({}));
        assert!(tx.provider_reference.is_none());
    }

    #[test]
    fn test_reference_validation() {
        assert!(validate_reference("topup-2024.01_a=").is_ok());
        assert!(validate_reference("").is_err());
        assert!(validate_reference("has space").is_err());
        assert!(validate_reference("semi;colon").is_err());
        assert!(validate_reference(&"x".repeat(MAX_REFERENCE_LEN + 1)).is_err());
    }
}
