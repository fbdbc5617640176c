//! Domain models for the payment reconciliation and wallet ledger service.

pub mod customer;
pub mod money;
pub mod payment;
pub mod wallet;
pub mod webhook;

pub use customer::CustomerId;
pub use money::{Currency, Money};
pub use payment::{
    Checkout, NewPayment, PaymentStatus, PaymentTransaction, StatusTransition, validate_reference,
};
pub use wallet::{BalanceMutation, BalanceSource, DebitPlan, EntryKind, WalletBalance, WalletEntry};
pub use webhook::{
    ChargeInitialized, ChargeRequest, ChargeVerification, GatewayEvent, GatewayEventKind,
};
