//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod gateway;
mod payment_store;
mod wallet_store;

pub use gateway::PaymentGateway;
pub use payment_store::PaymentStore;
pub use wallet_store::WalletStore;
