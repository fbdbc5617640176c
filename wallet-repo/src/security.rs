//! Integrity signing for persisted wallet state.
//!
//! Balances and ledger entries carry an HMAC-SHA256 over their identity and
//! value fields. The key never leaves this process, so a row edited outside
//! the ledger no longer verifies.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use wallet_types::{CustomerId, EntryKind, WalletBalance, WalletEntry};

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
#[error("Signing secret must be at least {MIN_SECRET_LEN} bytes, got {0}")]
pub struct WeakSecretError(pub usize);

/// Keyed digest over tuples of values.
pub struct IntegritySigner {
    key: Vec<u8>,
}

impl std::fmt::Debug for IntegritySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegritySigner").finish_non_exhaustive()
    }
}

impl IntegritySigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, WeakSecretError> {
        let secret = secret.as_ref();
        if secret.len() < MIN_SECRET_LEN {
            return Err(WeakSecretError(secret.len()));
        }
        Ok(Self {
            key: secret.to_vec(),
        })
    }

    /// Signs an ordered tuple of fields.
    ///
    /// Each field is length-prefixed so `("ab", "c")` and `("a", "bc")` differ.
    pub fn sign(&self, fields: &[&[u8]]) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        for field in fields {
            mac.update(&(field.len() as u64).to_be_bytes());
            mac.update(field);
        }
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verifies a signature using constant-time comparison.
    pub fn verify(&self, fields: &[&[u8]], signature: &str) -> bool {
        let expected = self.sign(fields);
        expected.as_bytes().ct_eq(signature.as_bytes()).into()
    }

    pub fn sign_balance(&self, customer_id: CustomerId, real: i64, promo: i64) -> String {
        let customer = customer_id.to_string();
        self.sign(&[
            b"balance",
            customer.as_bytes(),
            &real.to_be_bytes(),
            &promo.to_be_bytes(),
        ])
    }

    pub fn verify_balance(&self, balance: &WalletBalance) -> bool {
        let expected =
            self.sign_balance(balance.customer_id, balance.real_balance, balance.promo_balance);
        expected
            .as_bytes()
            .ct_eq(balance.signature.as_bytes())
            .into()
    }

    pub fn sign_entry(
        &self,
        customer_id: CustomerId,
        amount: i64,
        kind: EntryKind,
        reference_id: &str,
    ) -> String {
        let customer = customer_id.to_string();
        self.sign(&[
            b"entry",
            customer.as_bytes(),
            &amount.to_be_bytes(),
            kind.as_str().as_bytes(),
            reference_id.as_bytes(),
        ])
    }

    pub fn verify_entry(&self, entry: &WalletEntry) -> bool {
        let expected = self.sign_entry(
            entry.customer_id,
            entry.amount,
            entry.kind,
            &entry.reference_id,
        );
        expected.as_bytes().ct_eq(entry.signature.as_bytes()).into()
    }
}
