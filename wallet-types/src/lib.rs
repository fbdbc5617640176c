//! # Wallet Types
//!
//! Domain types and port traits for payment reconciliation and the
//! customer wallet ledger. This crate has ZERO external IO dependencies -
//! only data structures, business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, PaymentTransaction, WalletBalance)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    BalanceMutation, BalanceSource, ChargeInitialized, ChargeRequest, ChargeVerification,
    Checkout, Currency, CustomerId, DebitPlan, EntryKind, GatewayEvent, GatewayEventKind, Money,
    NewPayment, PaymentStatus, PaymentTransaction, StatusTransition, WalletBalance, WalletEntry,
    validate_reference,
};
pub use dto::*;
pub use error::{AppError, DomainError, GatewayError, LedgerError, RepoError};
pub use ports::{PaymentGateway, PaymentStore, WalletStore};
