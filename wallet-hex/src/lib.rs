//! # Wallet Hex
//!
//! Application services and HTTP adapter for payment reconciliation and the
//! customer wallet.
//!
//! ## Architecture
//!
//! - `reconciliation` - Initialize/verify orchestration against the gateway
//! - `ledger` - Signed dual-balance wallet, the only writer of balances
//! - `webhook` - Signature-checked gateway callbacks
//! - `sweep` - Background re-verification of stale payments
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! Services are generic over the store and gateway ports, so adapters are
//! injected at compile time and tests run against in-memory doubles.

pub mod inbound;
pub mod ledger;
pub mod locks;
pub mod openapi;
pub mod reconciliation;
pub mod sweep;
pub mod webhook;


pub use ledger::{Posting, WalletLedger};
pub use reconciliation::{EngineConfig, ReconciliationEngine};
pub use sweep::{ReconciliationSweep, SweepConfig};
pub use webhook::{WebhookIngestion, WebhookOutcome};
