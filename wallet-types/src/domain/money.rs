//! Type-safe monetary value with embedded currency.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::DomainError;

/// Currencies accepted by the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    NGN,
    GHS,
    ZAR,
    KES,
    USD,
}

impl Currency {
    /// Returns the currency symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::NGN => "₦",
            Currency::GHS => "GH₵",
            Currency::ZAR => "R",
            Currency::KES => "KSh",
            Currency::USD => "$",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::str::FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NGN" => Ok(Currency::NGN),
            "GHS" => Ok(Currency::GHS),
            "ZAR" => Ok(Currency::ZAR),
            "KES" => Ok(Currency::KES),
            "USD" => Ok(Currency::USD),
            other => Err(DomainError::ValidationError(format!(
                "Unsupported currency: {}",
                other
            ))),
        }
    }
}

/// A strictly positive charge amount with embedded currency.
///
/// Amount is stored in the smallest unit of the currency (kobo, pesewas, cents)
/// to avoid floating-point precision issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value. Charges are never zero or negative.
    pub fn new(amount: i64, currency: Currency) -> Result<Self, DomainError> {
        if amount <= 0 {
            return Err(DomainError::NonPositiveAmount(amount));
        }
        Ok(Self { amount, currency })
    }

    /// Returns the amount in smallest currency unit.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Returns the currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let major = self.amount / 100;
        let minor = (self.amount % 100).abs();
        write!(f, "{}{}.{:02}", self.currency.symbol(), major, minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let money = Money::new(250_000, Currency::NGN).unwrap();
        assert_eq!(money.amount(), 250_000);
        assert_eq!(money.currency(), Currency::NGN);
    }

    #[test]
    fn test_zero_and_negative_rejected() {
        assert!(matches!(
            Money::new(0, Currency::NGN),
            Err(DomainError::NonPositiveAmount(0))
        ));
        assert!(matches!(
            Money::new(-100, Currency::USD),
            Err(DomainError::NonPositiveAmount(-100))
        ));
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("ngn".parse::<Currency>().unwrap(), Currency::NGN);
        assert_eq!(" GHS ".parse::<Currency>().unwrap(), Currency::GHS);
        assert!("XYZ".parse::<Currency>().is_err());
    }

    #[test]
    fn test_money_display() {
        let money = Money::new(1050, Currency::NGN).unwrap();
        assert_eq!(format!("{}", money), "₦10.50");
    }
}
