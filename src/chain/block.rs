// src/chain/block.rs
//! Blocks carrying a puzzle proof.

use crate::chain::transaction::{Transaction, put};
use crate::puzzle::verify_encoded;
use crate::types::{Address, BlockHash, TxId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A block and its puzzle proof
///
/// Candidate blocks are created without a proof; `commitment` and `moves`
/// are filled in once the puzzle is solved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Hash of the parent, `None` only for genesis
    pub prev_block_hash: Option<BlockHash>,
    /// Number of blocks between this one and genesis
    pub chain_length: u64,
    /// Creation time in milliseconds since the epoch
    pub timestamp: u64,
    /// Miner credited with the block
    pub reward_addr: Option<Address>,
    /// Serialized puzzle this block must solve
    pub puzzle: Option<String>,
    /// Commitment over the solved grid
    pub commitment: Option<String>,
    /// Base64 JSON move list filling the puzzle
    pub moves: Option<String>,
    /// Wall-clock time the miner spent on the proof
    pub solve_duration_ms: u64,
    /// Included transactions keyed by id
    pub transactions: BTreeMap<TxId, Transaction>,
}

impl Block {
    /// The shared genesis block; identical on every participant
    pub fn genesis() -> Self {
        Block {
            prev_block_hash: None,
            chain_length: 0,
            timestamp: 0,
            reward_addr: None,
            puzzle: None,
            commitment: None,
            moves: None,
            solve_duration_ms: 0,
            transactions: BTreeMap::new(),
        }
    }

    /// Empty candidate extending `prev`
    pub fn new(reward_addr: Address, prev: &Block) -> Self {
        Block {
            prev_block_hash: Some(prev.hash()),
            chain_length: prev.chain_length + 1,
            timestamp: now_millis(),
            reward_addr: Some(reward_addr),
            ..Block::genesis()
        }
    }

    /// True for the block with no parent
    pub fn is_genesis(&self) -> bool {
        self.prev_block_hash.is_none()
    }

    /// Hex SHA-256 over every field, transactions in id order
    pub fn hash(&self) -> BlockHash {
        let mut hasher = Sha256::new();
        put_opt(&mut hasher, self.prev_block_hash.as_deref());
        hasher.update(self.chain_length.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        put_opt(&mut hasher, self.reward_addr.as_deref());
        put_opt(&mut hasher, self.puzzle.as_deref());
        put_opt(&mut hasher, self.commitment.as_deref());
        put_opt(&mut hasher, self.moves.as_deref());
        hasher.update(self.solve_duration_ms.to_le_bytes());
        hasher.update((self.transactions.len() as u64).to_le_bytes());
        for id in self.transactions.keys() {
            put(&mut hasher, id.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Adds a transaction; returns false if an equal one is already present
    pub fn add_transaction(&mut self, tx: Transaction) -> bool {
        let id = tx.id();
        if self.transactions.contains_key(&id) {
            return false;
        }
        self.transactions.insert(id, tx);
        true
    }

    /// Whether the block contains an equal transaction
    pub fn contains(&self, tx: &Transaction) -> bool {
        self.transactions.contains_key(&tx.id())
    }

    /// Whether the stored move list fills the stored puzzle into a grid
    /// matching the stored commitment
    ///
    /// This does not check that the puzzle is the one the parent dictates;
    /// see [`crate::chain::ChainParams::puzzle_for`].
    pub fn has_valid_proof(&self) -> bool {
        match (&self.puzzle, &self.commitment, &self.moves) {
            (Some(puzzle), Some(commitment), Some(moves)) => {
                verify_encoded(puzzle, commitment, moves)
            }
            _ => false,
        }
    }
}

fn put_opt(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            put(hasher, v.as_bytes());
        }
        None => hasher.update([0u8]),
    }
}

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
