// src/chain/transaction.rs
//! Signed transactions.
//!
//! The engine treats transactions as opaque values compared by content; the
//! only ledger rule enforced here is that the signature matches the sender.

use crate::types::{Address, TxId};
use crate::utils::error::MinerError;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Amount paid to an address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Output {
    /// Amount of gold transferred
    pub amount: u64,
    /// Recipient address
    pub address: Address,
}

/// A signed transfer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender address, derived from `pub_key`
    pub from: Address,
    /// Per-sender counter, keeps equal transfers distinct
    pub nonce: u64,
    /// Hex ed25519 public key of the sender
    pub pub_key: String,
    /// Payments made by this transaction
    pub outputs: Vec<Output>,
    /// Fee offered to the miner
    pub fee: u64,
    /// Hex ed25519 signature over the transaction id
    pub sig: Option<String>,
}

/// Address for a public key: base64 of its SHA-256
pub fn calc_address(key: &VerifyingKey) -> Address {
    STANDARD.encode(Sha256::digest(key.as_bytes()))
}

impl Transaction {
    /// Creates an unsigned transaction from `key`'s owner
    pub fn new(key: &VerifyingKey, nonce: u64, outputs: Vec<Output>, fee: u64) -> Self {
        Transaction {
            from: calc_address(key),
            nonce,
            pub_key: hex::encode(key.as_bytes()),
            outputs,
            fee,
            sig: None,
        }
    }

    /// Hex SHA-256 over every field except the signature
    pub fn id(&self) -> TxId {
        let mut hasher = Sha256::new();
        put(&mut hasher, self.from.as_bytes());
        hasher.update(self.nonce.to_le_bytes());
        put(&mut hasher, self.pub_key.as_bytes());
        hasher.update((self.outputs.len() as u64).to_le_bytes());
        for output in &self.outputs {
            hasher.update(output.amount.to_le_bytes());
            put(&mut hasher, output.address.as_bytes());
        }
        hasher.update(self.fee.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    /// Signs the transaction id
    pub fn sign(&mut self, key: &SigningKey) {
        let sig = key.sign(self.id().as_bytes());
        self.sig = Some(hex::encode(sig.to_bytes()));
    }

    /// Total paid to outputs, excluding the fee
    pub fn total_output(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount).sum()
    }

    /// Checks structure, sender address and signature
    ///
    /// # Errors
    /// `MinerError::TransactionError` for structural problems or a bad
    /// signature, `MinerError::CryptoError` for undecodable keys
    pub fn verify(&self) -> Result<(), MinerError> {
        if self.outputs.is_empty() {
            return Err(MinerError::TransactionError("no outputs".into()));
        }
        if self.outputs.iter().any(|o| o.amount == 0) {
            return Err(MinerError::TransactionError("zero-amount output".into()));
        }

        let key_bytes: [u8; 32] = hex::decode(&self.pub_key)?
            .try_into()
            .map_err(|_| MinerError::CryptoError("public key must be 32 bytes".into()))?;
        let key = VerifyingKey::from_bytes(&key_bytes)?;

        if calc_address(&key) != self.from {
            return Err(MinerError::TransactionError(format!(
                "sender {} does not match public key",
                self.from
            )));
        }

        let sig = self
            .sig
            .as_deref()
            .ok_or_else(|| MinerError::TransactionError("unsigned".into()))?;
        let sig_bytes: [u8; 64] = hex::decode(sig)?
            .try_into()
            .map_err(|_| MinerError::CryptoError("signature must be 64 bytes".into()))?;

        key.verify(self.id().as_bytes(), &Signature::from_bytes(&sig_bytes))
            .map_err(|_| MinerError::TransactionError(format!("bad signature on {}", self.id())))
    }
}

/// Length-prefixed write so adjacent fields cannot run together
pub(crate) fn put(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::OsRng;

    /// Signed single-output transaction from a fresh key
    pub(crate) fn signed_tx(amount: u64, nonce: u64) -> Transaction {
        let key = SigningKey::generate(&mut OsRng);
        let mut tx = Transaction::new(
            &key.verifying_key(),
            nonce,
            vec![Output {
                amount,
                address: "bob".into(),
            }],
            1,
        );
        tx.sign(&key);
        tx
    }

    #[test]
    fn signed_transaction_verifies() {
        let tx = signed_tx(40, 0);
        assert!(tx.verify().is_ok());
        assert_eq!(tx.total_output(), 40);
    }

    #[test]
    fn tampering_breaks_the_signature() {
        let mut tx = signed_tx(40, 0);
        tx.outputs[0].amount = 4000;
        assert!(matches!(tx.verify(), Err(MinerError::TransactionError(_))));
    }

    #[test]
    fn unsigned_or_spoofed_transactions_fail() {
        let key = SigningKey::generate(&mut OsRng);
        let outputs = vec![Output {
            amount: 1,
            address: "carol".into(),
        }];
        let unsigned = Transaction::new(&key.verifying_key(), 0, outputs.clone(), 0);
        assert!(unsigned.verify().is_err());

        let mut spoofed = Transaction::new(&key.verifying_key(), 0, outputs, 0);
        spoofed.from = "someone-else".into();
        spoofed.sign(&key);
        assert!(spoofed.verify().is_err());
    }

    #[test]
    fn id_ignores_signature_and_tracks_content() {
        let key = SigningKey::generate(&mut OsRng);
        let outputs = vec![Output {
            amount: 5,
            address: "dave".into(),
        }];
        let mut a = Transaction::new(&key.verifying_key(), 0, outputs.clone(), 0);
        let before = a.id();
        a.sign(&key);
        assert_eq!(a.id(), before);

        let b = Transaction::new(&key.verifying_key(), 1, outputs, 0);
        assert_ne!(a.id(), b.id());
    }
}
